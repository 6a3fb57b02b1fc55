//! Shared types and domain logic for the Cooperative Coffee QC Platform
//!
//! This crate contains the lot workflow engine, domain models, and
//! validation helpers shared between the backend and other components.

pub mod error;
pub mod lookup;
pub mod models;
pub mod types;
pub mod validation;
pub mod workflow;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
