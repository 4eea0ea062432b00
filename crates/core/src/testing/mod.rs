//! Testing utilities and mock implementations.
//!
//! Mocks for every external seam of the workflows, so deployments can be
//! exercised end to end without marketplace accounts or a terminal.
//!
//! # Example
//!
//! ```rust,ignore
//! use fieldwork_core::testing::{MockMarketplace, ScriptedDecisions};
//! use fieldwork_core::decision::DecisionKey;
//!
//! let marketplace = MockMarketplace::mturk();
//! marketplace.fail_assignment_for("W2").await;
//!
//! let decisions = ScriptedDecisions::new()
//!     .answer(DecisionKey::ConfirmPaidPost, true)
//!     .answer(DecisionKey::AvoidExtraFee, true);
//! ```

mod mock_marketplace;
mod scripted_decisions;

pub use mock_marketplace::{MockMarketplace, ProviderCall, RecordedAssignment};
pub use scripted_decisions::ScriptedDecisions;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::config::{
        ApprovalRateCutoff, DescriptionSections, DurationSpec, MturkStudyConfig,
        ProlificStudyConfig, Screeners, StudyConfig,
    };
    use crate::provider::{ProlificProject, ProlificWorkspace};

    /// Description with every section populated.
    pub fn description() -> DescriptionSections {
        DescriptionSections {
            requirements_list: vec!["A desktop computer".to_string()],
            requirements_para: vec!["Please use Chrome.".to_string()],
            summary_para: vec![
                "Reach to targets.".to_string(),
                "Takes about 20 minutes.".to_string(),
            ],
            instructions_list: vec!["Click the link".to_string()],
            instructions_para: vec![],
        }
    }

    /// Screeners with an age range and a 99% approval cutoff.
    pub fn age_and_cutoff() -> Screeners {
        Screeners {
            age_range: Some([18, 40]),
            restrict_approval_rate: Some(ApprovalRateCutoff::Percent(99.0)),
            ..Screeners::default()
        }
    }

    pub fn mturk_config() -> MturkStudyConfig {
        MturkStudyConfig {
            reward: "1.50".to_string(),
            keywords: "reaching, motor".to_string(),
            allotted_time: DurationSpec::hours(1),
            expiration: DurationSpec::days(7),
            auto_approve: DurationSpec::days(3),
        }
    }

    pub fn prolific_config() -> ProlificStudyConfig {
        ProlificStudyConfig {
            estimated_completion_time: 20,
            maximum_allowed_time: Some(60),
            reward: 300,
            compatible_devices: vec!["desktop".to_string()],
            naivety: None,
            project: None,
        }
    }

    /// A study deployable on both marketplaces.
    pub fn study(places: u32) -> StudyConfig {
        StudyConfig {
            title: "Reach task".to_string(),
            description: description(),
            total_available_places: places,
            compensation: false,
            workers_to_compensate: Vec::new(),
            screeners: Screeners::default(),
            prolific: Some(prolific_config()),
            mturk: Some(mturk_config()),
        }
    }

    /// A compensation run for the given workers.
    pub fn compensation(workers: &[&str]) -> StudyConfig {
        StudyConfig {
            title: "Compensation".to_string(),
            compensation: true,
            workers_to_compensate: workers.iter().map(|w| w.to_string()).collect(),
            prolific: None,
            ..study(0)
        }
    }

    pub fn workspace(id: &str, title: &str) -> ProlificWorkspace {
        ProlificWorkspace {
            id: id.to_string(),
            title: title.to_string(),
        }
    }

    pub fn project(id: &str, title: &str) -> ProlificProject {
        ProlificProject {
            id: id.to_string(),
            title: title.to_string(),
        }
    }
}
