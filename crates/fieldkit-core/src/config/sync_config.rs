//! Configuration for the sync orchestrator.
//!
//! # Examples
//!
//! ```
//! use fieldkit_core::config::SyncConfig;
//!
//! let config = SyncConfig::default();
//! assert_eq!(config.debounce_window_secs, 2);
//! assert_eq!(config.remote_timeout_secs, 8);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DEBOUNCE_WINDOW_SECS, DEFAULT_REMOTE_TIMEOUT_SECS};
use crate::errors::{FieldkitError, FieldkitResult};

/// Configuration for the sync orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds that a burst of `schedule_sync` calls is coalesced over. Default: 2.
    pub debounce_window_secs: u64,
    /// Bound on any single remote call, in seconds. Default: 8.
    pub remote_timeout_secs: u64,
    /// Whether a reconciled user set that diverges from the raw remote set
    /// is pushed back up after merging. Default: true.
    pub push_reconciled_users: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_window_secs: DEFAULT_DEBOUNCE_WINDOW_SECS,
            remote_timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
            push_reconciled_users: true,
        }
    }
}

impl SyncConfig {
    /// Parse a config from a TOML string. Missing keys fall back to defaults.
    pub fn from_toml_str(raw: &str) -> FieldkitResult<Self> {
        toml::from_str(raw).map_err(|e| FieldkitError::Config {
            reason: e.to_string(),
        })
    }

    /// Debounce window as a `Duration`.
    pub fn debounce_window(&self) -> Duration {
        Duration::from_secs(self.debounce_window_secs)
    }

    /// Remote call bound as a `Duration`.
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_windows() {
        let config = SyncConfig::default();
        assert_eq!(config.debounce_window(), Duration::from_secs(2));
        assert_eq!(config.remote_timeout(), Duration::from_secs(8));
        assert!(config.push_reconciled_users);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SyncConfig::from_toml_str("remote_timeout_secs = 10").unwrap();
        assert_eq!(config.remote_timeout_secs, 10);
        assert_eq!(config.debounce_window_secs, 2);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let err = SyncConfig::from_toml_str("debounce_window_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, FieldkitError::Config { .. }));
    }
}
