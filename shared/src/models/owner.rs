//! Owner ledger and lot-scoped owner entry models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Master owner record, shared across lots and keyed by national id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub id: Uuid,
    pub full_name: String,
    /// Cédula, unique across the ledger (normalized digits)
    pub national_id: String,
    pub phone: Option<String>,
    pub address: OwnerAddress,
    /// Number of lots this owner has delivered into
    pub delivery_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Owner home address
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerAddress {
    pub province: Option<String>,
    pub city: Option<String>,
    pub neighborhood: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub landmarks: Option<String>,
}

/// Inline data for an owner not yet in the master ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOwnerData {
    pub full_name: String,
    pub national_id: String,
    pub phone: Option<String>,
    pub address: OwnerAddress,
}

/// How a lot entry identifies its owner at submit time.
///
/// Resolved exactly once at lot creation: an existing reference keeps the
/// master data (submitted fields are ignored), inline data creates a new
/// master record. The two arms are never both populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum OwnerSource {
    Existing { owner_id: Uuid },
    New(NewOwnerData),
}

/// Flattened view of an entry joined with its master owner, used by the
/// workflow engine and report responses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    pub entry_id: Uuid,
    pub owner_id: Uuid,
    pub full_name: String,
    pub national_id: String,
    pub quintals_delivered: Decimal,
}
