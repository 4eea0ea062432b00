//! Eligibility requirements.
//!
//! Converts abstract [`Screeners`](crate::config::Screeners) into the ordered
//! requirement list a marketplace expects. List order is part of the output
//! and is stable for a given input.

mod builder;
pub mod taxonomy;
mod types;

pub use builder::{EligibilityChoices, EligibilityRuleBuilder};
pub use types::*;
