//! Marketplace deployment providers.
//!
//! Both marketplaces are reached through the [`DeploymentProvider`] trait,
//! which normalizes their APIs to create / patch / list / transition. The
//! adapters differ in authentication: Prolific takes a static API token,
//! MTurk signs every call with AWS credentials through a [`RequestSigner`].

mod mturk;
mod prolific;
mod signing;
mod types;

pub use mturk::{MturkClient, MTURK_API_VERSION};
pub use signing::{RequestSigner, MTURK_SIGNING_NAME};
pub use prolific::{ProlificClient, ProlificProject, ProlificWorkspace, PROLIFIC_STUDY_STATES};
pub use types::*;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur when talking to a marketplace.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Marketplace returned a non-success response.
    #[error("API error: {status} - {message}")]
    ApiError {
        status: u16,
        message: String,
        /// The marketplace's own error payload, verbatim.
        detail: Option<String>,
    },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing token, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),

    /// The request could not be signed.
    #[error("Failed to sign request: {0}")]
    Signing(String),

    /// The marketplace has no equivalent of the requested operation.
    #[error("{marketplace} does not support {operation}")]
    Unsupported {
        marketplace: Marketplace,
        operation: String,
    },
}

impl ProviderError {
    /// The provider's own error detail, when it sent one.
    pub fn provider_detail(&self) -> Option<&str> {
        match self {
            ProviderError::ApiError { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

/// Uniform interface over a marketplace's deployment API.
///
/// Calls fail fast: any non-success response surfaces as a
/// [`ProviderError`] and nothing is retried.
#[async_trait]
pub trait DeploymentProvider: Send + Sync {
    /// The marketplace this provider talks to.
    fn marketplace(&self) -> Marketplace;

    /// Create a deployment and return its id.
    async fn create(&self, payload: &Value) -> Result<String, ProviderError>;

    /// Update an existing deployment and return its id.
    async fn patch(&self, id: &str, payload: &Value) -> Result<String, ProviderError>;

    /// List deployments matching the filter.
    async fn list(&self, filter: &ListFilter) -> Result<Vec<DeploymentRecord>, ProviderError>;

    /// Move a deployment to another lifecycle state.
    async fn transition(
        &self,
        id: &str,
        action: TransitionAction,
    ) -> Result<Acknowledgement, ProviderError>;
}

/// Workspaces and projects new Prolific studies are filed under.
#[async_trait]
pub trait WorkspaceDirectory: Send + Sync {
    async fn workspaces(&self) -> Result<Vec<ProlificWorkspace>, ProviderError>;

    async fn projects(&self, workspace_id: &str) -> Result<Vec<ProlificProject>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_detail_only_for_api_errors() {
        let err = ProviderError::ApiError {
            status: 400,
            message: "Bad Request".to_string(),
            detail: Some("{\"reward\":[\"too low\"]}".to_string()),
        };
        assert_eq!(err.provider_detail(), Some("{\"reward\":[\"too low\"]}"));

        let err = ProviderError::ParseError("nope".to_string());
        assert!(err.provider_detail().is_none());
    }

    #[test]
    fn test_unsupported_message() {
        let err = ProviderError::Unsupported {
            marketplace: Marketplace::Mturk,
            operation: "transition PAUSE".to_string(),
        };
        assert_eq!(err.to_string(), "mturk does not support transition PAUSE");
    }
}
