//! Domain models for the Cooperative Coffee QC Platform

mod lot;
mod organization;
mod owner;
mod processing;
mod sample;
mod separation;

pub use lot::*;
pub use organization::*;
pub use owner::*;
pub use processing::*;
pub use sample::*;
pub use separation::*;
