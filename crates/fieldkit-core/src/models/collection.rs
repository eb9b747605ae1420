//! Named collections, the unit of synchronization.
//!
//! A collection is always replaced wholesale on write; a fetched value is a
//! complete snapshot of that collection only, never of the whole system.

use serde::{Deserialize, Serialize};

/// The named collections tracked by the sync layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Users,
    Technicians,
    Suppliers,
    Parts,
    Requisitions,
    Settings,
}

impl Collection {
    /// Every tracked collection, in pull order.
    pub const ALL: [Collection; 6] = [
        Collection::Users,
        Collection::Technicians,
        Collection::Suppliers,
        Collection::Parts,
        Collection::Requisitions,
        Collection::Settings,
    ];

    /// Stable string key used on the wire and in log output.
    pub fn key(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Technicians => "technicians",
            Collection::Suppliers => "suppliers",
            Collection::Parts => "parts",
            Collection::Requisitions => "requisitions",
            Collection::Settings => "settings",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}
