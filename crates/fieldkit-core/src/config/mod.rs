//! Configuration structs, deserializable from TOML.

mod sync_config;

pub use sync_config::SyncConfig;
