//! Business logic services for the Cooperative Coffee QC Platform

pub mod lot;
pub mod organization;
pub mod owner;
pub mod processing;
pub mod sample;
pub mod separation;

pub use lot::LotService;
pub use organization::OrganizationService;
pub use owner::OwnerService;
pub use processing::ProcessingService;
pub use sample::SampleService;
pub use separation::SeparationService;
