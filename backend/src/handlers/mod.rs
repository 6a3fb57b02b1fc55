//! HTTP handlers for the Cooperative Coffee QC Platform

pub mod health;
pub mod lot;
pub mod organization;
pub mod owner;
pub mod processing;
pub mod sample;
pub mod separation;

pub use health::*;
pub use lot::*;
pub use organization::*;
pub use owner::*;
pub use processing::*;
pub use sample::*;
pub use separation::*;
