//! Organization models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A cooperative member organization that delivers intake lots
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub org_type: OrganizationType,
    /// RUC (tax registry number), unique per organization
    pub tax_id: String,
    pub contact: ContactInfo,
    pub location: OrgLocation,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Organization classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationType {
    Association,
    Cooperative,
    IndependentProducer,
    IntermediaryBuyer,
}

impl OrganizationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationType::Association => "association",
            OrganizationType::Cooperative => "cooperative",
            OrganizationType::IndependentProducer => "independent_producer",
            OrganizationType::IntermediaryBuyer => "intermediary_buyer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "association" => Some(OrganizationType::Association),
            "cooperative" => Some(OrganizationType::Cooperative),
            "independent_producer" => Some(OrganizationType::IndependentProducer),
            "intermediary_buyer" => Some(OrganizationType::IntermediaryBuyer),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrganizationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrganizationType::Association => write!(f, "Association"),
            OrganizationType::Cooperative => write!(f, "Cooperative"),
            OrganizationType::IndependentProducer => write!(f, "Independent Producer"),
            OrganizationType::IntermediaryBuyer => write!(f, "Intermediary Buyer"),
        }
    }
}

/// Contact details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Organization location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgLocation {
    pub province: String,
    pub canton: String,
    pub city: Option<String>,
    pub geocode: Option<String>,
}
