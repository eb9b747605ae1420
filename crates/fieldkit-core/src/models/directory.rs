//! Directory entities: technicians, suppliers, and the parts catalog.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A field technician who submits requisitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technician {
    pub id: String,
    pub name: String,
    /// Soft-disable flag; entities are never hard-deleted once referenced.
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

/// A parts supplier assignable at approval time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

/// A catalog part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub code: String,
    pub description: String,
    pub unit_price: Decimal,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}
