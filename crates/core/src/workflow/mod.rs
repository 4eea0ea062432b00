//! Deployment workflows.
//!
//! Each workflow resolves every human decision it needs up front, then runs
//! its marketplace calls in sequence. Errors stop the run; anything already
//! created on the marketplace stays there and is journaled.

mod mturk;
mod plan;
mod prolific;

pub use mturk::{hit_request, MturkDeployment, MturkOutcome};
pub use plan::{MturkDecisionPlan, MturkDecisions};
pub use prolific::{
    completion_code_patch, CompletionAction, CompletionCode, ProlificDeployment, ProlificDraft,
    ProlificStudy, COMPLETION_CODE, PROLIFIC_STUDY_PREVIEW,
};

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::decision::DecisionError;
use crate::history::HistoryError;
use crate::payload::PayloadError;
use crate::provider::{DeploymentProvider, DeploymentRecord, ListFilter, ProviderError};
use crate::qualification::AssignmentReport;

/// Errors that end a deployment run.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Decision(#[from] DecisionError),

    /// The user answered no to a required confirmation.
    #[error("{0}")]
    Declined(String),

    /// The experiment has no hosted site to point participants at.
    #[error("No deployed site recorded for '{experiment}'; deploy the study site first")]
    NoSite { experiment: String },

    /// Nothing matched for a publish.
    #[error("No unpublished drafts found for '{experiment}'")]
    NothingToPublish { experiment: String },

    /// The compensation qualification reached none of the listed workers.
    #[error("Compensation qualification {} could not be assigned to any worker", .report.qualification_id)]
    NoEligibleWorkers { report: AssignmentReport },

    /// A batch create failed; earlier batches stay live.
    #[error(
        "Batch {index} of {planned} failed after {} batch(es) were created: {source}",
        .completed.len()
    )]
    BatchFailed {
        index: u32,
        planned: u32,
        /// Ids of the batches created before the failure.
        completed: Vec<String>,
        #[source]
        source: ProviderError,
    },
}

impl DeployError {
    /// Structured view for the caller to print.
    pub fn report(&self) -> ErrorReport {
        let provider_detail = match self {
            DeployError::Provider(e) | DeployError::BatchFailed { source: e, .. } => {
                e.provider_detail().map(str::to_string)
            }
            _ => None,
        };

        ErrorReport {
            message: self.to_string(),
            provider_detail,
        }
    }
}

/// An error as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_detail: Option<String>,
}

/// List an experiment's deployments on any marketplace.
pub async fn list_deployments(
    provider: &dyn DeploymentProvider,
    experiment: &str,
) -> Result<Vec<DeploymentRecord>, DeployError> {
    Ok(provider.list(&ListFilter::by_name(experiment)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Marketplace;

    #[test]
    fn test_report_carries_provider_detail() {
        let err = DeployError::BatchFailed {
            index: 2,
            planned: 3,
            completed: vec!["HIT1".to_string()],
            source: ProviderError::ApiError {
                status: 400,
                message: "Bad Request".to_string(),
                detail: Some("{\"Message\":\"Insufficient funds\"}".to_string()),
            },
        };

        let report = err.report();
        assert_eq!(
            report.message,
            "Batch 2 of 3 failed after 1 batch(es) were created: API error: 400 - Bad Request"
        );
        assert_eq!(
            report.provider_detail.as_deref(),
            Some("{\"Message\":\"Insufficient funds\"}")
        );
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = DeployError::Provider(ProviderError::Unsupported {
            marketplace: Marketplace::Mturk,
            operation: "transition PAUSE".to_string(),
        })
        .report();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["message"], "mturk does not support transition PAUSE");
        assert!(json.get("providerDetail").is_none());

        let with_detail = ErrorReport {
            message: "m".to_string(),
            provider_detail: Some("d".to_string()),
        };
        assert_eq!(serde_json::to_value(&with_detail).unwrap()["providerDetail"], "d");
    }

    #[test]
    fn test_config_error_message() {
        let err = DeployError::from(ConfigError::ValidationError(
            "workers_to_compensate is empty".to_string(),
        ));
        assert!(err.report().message.contains("workers_to_compensate"));
        assert!(err.report().provider_detail.is_none());
    }
}
