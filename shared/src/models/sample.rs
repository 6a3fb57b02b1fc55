//! Physical sample models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of samples per selection round
pub const MAX_SAMPLES_PER_ROUND: usize = 5;

/// A physical sample taken from one owner's delivery within a lot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub id: Uuid,
    /// Display number "M1".."M5", assigned in selection order within a round.
    /// The number is the only correlation between a sample and its owner.
    pub sample_number: String,
    pub lot_id: Uuid,
    pub owner_entry_id: Uuid,
    /// Sampling round, starting at 1; re-verification rounds increment
    pub round: i32,
    pub state: SampleState,
    pub taken_at: DateTime<Utc>,
    pub analysis_result: Option<String>,
    pub observations: Option<String>,
}

/// Analysis state of a sample; written exactly once per round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleState {
    Pending,
    Approved,
    Contaminated,
}

impl SampleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleState::Pending => "pending",
            SampleState::Approved => "approved",
            SampleState::Contaminated => "contaminated",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SampleState::Pending),
            "approved" => Some(SampleState::Approved),
            "contaminated" => Some(SampleState::Contaminated),
            _ => None,
        }
    }
}

impl std::fmt::Display for SampleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleState::Pending => write!(f, "Pending"),
            SampleState::Approved => write!(f, "Approved"),
            SampleState::Contaminated => write!(f, "Contaminated"),
        }
    }
}

/// Lab outcome for a single sample; `Pending` is not a recordable outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleOutcome {
    Approved,
    Contaminated,
}

impl From<SampleOutcome> for SampleState {
    fn from(outcome: SampleOutcome) -> Self {
        match outcome {
            SampleOutcome::Approved => SampleState::Approved,
            SampleOutcome::Contaminated => SampleState::Contaminated,
        }
    }
}

/// Format a sample display number from its 1-based position
pub fn sample_number(position: usize) -> String {
    format!("M{}", position)
}
