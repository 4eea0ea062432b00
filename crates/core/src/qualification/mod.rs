//! Worker-visibility qualifications.
//!
//! A qualification named after the experiment marks workers who already took
//! part, so later deployments can exclude them. Compensation runs use a fresh
//! one-off qualification as an existence gate instead.

mod manager;
mod types;

pub use manager::QualificationStateManager;
pub use types::*;
