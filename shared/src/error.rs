//! Workflow error types shared between the engine and its callers
//!
//! Stage operations validate exhaustively before any mutation and report
//! every violation at once, so callers can render a full form-level summary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single field-level validation violation, with bilingual messages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub message_en: String,
    pub message_es: String,
}

impl FieldViolation {
    pub fn new(field: &str, message_en: &str, message_es: &str) -> Self {
        Self {
            field: field.to_string(),
            message_en: message_en.to_string(),
            message_es: message_es.to_string(),
        }
    }
}

/// Errors produced by the lot workflow engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    /// Malformed, missing, or out-of-range input; every violation collected
    #[error("validation failed with {} violation(s)", .0.len())]
    Validation(Vec<FieldViolation>),

    /// Operation attempted from a state that does not permit it
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Referenced lot, owner, sample, or organization is absent
    #[error("{0} not found")]
    NotFound(String),
}

impl WorkflowError {
    /// Single-violation convenience constructor
    pub fn field(field: &str, message_en: &str, message_es: &str) -> Self {
        WorkflowError::Validation(vec![FieldViolation::new(field, message_en, message_es)])
    }
}

/// Result alias for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;
