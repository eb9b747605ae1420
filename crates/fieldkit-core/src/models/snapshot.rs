//! The consolidated state snapshot used for cross-session bootstrap.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Collection;

/// A point-in-time bundle of all collections plus write metadata.
///
/// Only used for bootstrap/merge across sessions, never for per-collection
/// sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub collections: HashMap<Collection, serde_json::Value>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}
