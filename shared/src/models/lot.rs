//! Lot model and the explicit lot lifecycle state machine

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::owner::OwnerSource;

/// An intake lot tracked through the quality-control workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub id: Uuid,
    /// Unique lot code (e.g., "LOTE-2026-0001")
    pub code: String,
    pub organization_id: Uuid,
    pub harvest_date: NaiveDate,
    pub delivery_date: DateTime<Utc>,
    pub declared_quintals: Decimal,
    pub initial_weight_kg: Decimal,
    /// Set only after the cleaning stage
    pub final_weight_kg: Option<Decimal>,
    pub state: LotState,
    pub weight_observations: Option<String>,
    pub observations: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lot {
    /// Weight the next pipeline stage operates on
    pub fn current_weight_kg(&self) -> Decimal {
        self.final_weight_kg.unwrap_or(self.initial_weight_kg)
    }
}

/// Lifecycle state of a lot.
///
/// `Separated` is reached both after a physical contamination split and
/// after color separation; cleaning accepts either origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotState {
    Pending,
    InProcess,
    Approved,
    Rejected,
    SeparationPending,
    SeparationApplied,
    Separated,
    Clean,
    Finalized,
}

impl LotState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LotState::Pending => "pending",
            LotState::InProcess => "in_process",
            LotState::Approved => "approved",
            LotState::Rejected => "rejected",
            LotState::SeparationPending => "separation_pending",
            LotState::SeparationApplied => "separation_applied",
            LotState::Separated => "separated",
            LotState::Clean => "clean",
            LotState::Finalized => "finalized",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(LotState::Pending),
            "in_process" => Some(LotState::InProcess),
            "approved" => Some(LotState::Approved),
            "rejected" => Some(LotState::Rejected),
            "separation_pending" => Some(LotState::SeparationPending),
            "separation_applied" => Some(LotState::SeparationApplied),
            "separated" => Some(LotState::Separated),
            "clean" => Some(LotState::Clean),
            "finalized" => Some(LotState::Finalized),
            _ => None,
        }
    }

    /// Terminal states admit no further workflow transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, LotState::Finalized | LotState::Rejected)
    }

    /// Apply a workflow event, returning the successor state.
    ///
    /// This is the single transition table every stage operation validates
    /// against; any pair not listed here is rejected.
    pub fn apply(self, event: LotEvent) -> Result<LotState, TransitionError> {
        use LotEvent::*;
        use LotState::*;

        let next = match (self, event) {
            (Pending, SamplesSelected) => InProcess,
            (InProcess, AllSamplesApproved) => Approved,
            (InProcess, ContaminationConfirmed) => SeparationPending,
            (SeparationPending, SecondSamplingCreated) => InProcess,
            (SeparationPending, AllSamplesApproved) => Approved,
            (SeparationPending, SeparationPlanApplied) => SeparationApplied,
            (SeparationApplied, SeparationCompleted) => Separated,
            (InProcess, LotRejected) | (SeparationPending, LotRejected) => Rejected,
            (Approved, CleaningCompleted) | (Separated, CleaningCompleted) => Clean,
            (Clean, ColorSeparationCompleted) => Separated,
            (Separated, ReceptionFinalized) => Finalized,
            (from, event) => return Err(TransitionError { from, event }),
        };
        Ok(next)
    }
}

impl std::fmt::Display for LotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LotState::Pending => write!(f, "Pending"),
            LotState::InProcess => write!(f, "In Process"),
            LotState::Approved => write!(f, "Approved"),
            LotState::Rejected => write!(f, "Rejected"),
            LotState::SeparationPending => write!(f, "Separation Pending"),
            LotState::SeparationApplied => write!(f, "Separation Applied"),
            LotState::Separated => write!(f, "Separated"),
            LotState::Clean => write!(f, "Clean"),
            LotState::Finalized => write!(f, "Finalized"),
        }
    }
}

/// Workflow events that advance a lot through its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotEvent {
    SamplesSelected,
    AllSamplesApproved,
    ContaminationConfirmed,
    SecondSamplingCreated,
    SeparationPlanApplied,
    SeparationCompleted,
    LotRejected,
    CleaningCompleted,
    ColorSeparationCompleted,
    ReceptionFinalized,
}

/// A state/event pair the transition table rejects
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("event {event:?} is not permitted from state {from}")]
pub struct TransitionError {
    pub from: LotState,
    pub event: LotEvent,
}

/// Unvalidated lot creation input, before owner resolution
#[derive(Debug, Clone)]
pub struct LotDraft {
    pub code: String,
    pub organization_id: Option<Uuid>,
    pub harvest_date: Option<NaiveDate>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub declared_quintals: Decimal,
    /// Explicit override; when absent, `declared_quintals * 46` is used
    pub initial_weight_kg: Option<Decimal>,
    pub weight_observations: Option<String>,
    pub observations: Option<String>,
    pub owners: Vec<OwnerEntryDraft>,
}

/// Unvalidated owner entry input
#[derive(Debug, Clone)]
pub struct OwnerEntryDraft {
    pub quintals_delivered: Decimal,
    pub source: OwnerSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let s = LotState::Pending;
        let s = s.apply(LotEvent::SamplesSelected).unwrap();
        assert_eq!(s, LotState::InProcess);
        let s = s.apply(LotEvent::AllSamplesApproved).unwrap();
        assert_eq!(s, LotState::Approved);
        let s = s.apply(LotEvent::CleaningCompleted).unwrap();
        assert_eq!(s, LotState::Clean);
        let s = s.apply(LotEvent::ColorSeparationCompleted).unwrap();
        assert_eq!(s, LotState::Separated);
        let s = s.apply(LotEvent::ReceptionFinalized).unwrap();
        assert_eq!(s, LotState::Finalized);
        assert!(s.is_terminal());
    }

    #[test]
    fn test_contamination_loop() {
        let s = LotState::InProcess
            .apply(LotEvent::ContaminationConfirmed)
            .unwrap();
        assert_eq!(s, LotState::SeparationPending);
        // Second sampling loops back into analysis
        let s2 = s.apply(LotEvent::SecondSamplingCreated).unwrap();
        assert_eq!(s2, LotState::InProcess);
        // Or the salvage plan is applied and executed
        let s3 = s.apply(LotEvent::SeparationPlanApplied).unwrap();
        assert_eq!(s3, LotState::SeparationApplied);
        let s3 = s3.apply(LotEvent::SeparationCompleted).unwrap();
        assert_eq!(s3, LotState::Separated);
        // Separated fraction can be cleaned
        assert_eq!(
            s3.apply(LotEvent::CleaningCompleted).unwrap(),
            LotState::Clean
        );
    }

    #[test]
    fn test_out_of_order_stage_rejected() {
        // Color separation straight from Approved must be rejected
        let err = LotState::Approved
            .apply(LotEvent::ColorSeparationCompleted)
            .unwrap_err();
        assert_eq!(err.from, LotState::Approved);

        // Finalized is terminal
        for event in [
            LotEvent::SamplesSelected,
            LotEvent::CleaningCompleted,
            LotEvent::ReceptionFinalized,
        ] {
            assert!(LotState::Finalized.apply(event).is_err());
        }
    }

    #[test]
    fn test_state_round_trip() {
        for state in [
            LotState::Pending,
            LotState::InProcess,
            LotState::Approved,
            LotState::Rejected,
            LotState::SeparationPending,
            LotState::SeparationApplied,
            LotState::Separated,
            LotState::Clean,
            LotState::Finalized,
        ] {
            assert_eq!(LotState::from_str(state.as_str()), Some(state));
        }
        assert_eq!(LotState::from_str("unknown"), None);
    }
}
