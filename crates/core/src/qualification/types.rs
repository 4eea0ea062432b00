//! Qualification types and the backend trait.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::provider::ProviderError;

/// A qualification type owned by the requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationRecord {
    /// Marketplace-scoped id.
    pub id: String,
    pub name: String,
    /// Workers this run has assigned the qualification to.
    #[serde(default)]
    pub assigned_workers: BTreeSet<String>,
}

impl QualificationRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            assigned_workers: BTreeSet::new(),
        }
    }
}

/// Request to create a qualification type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQualification {
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
}

/// Outcome of assigning one qualification to many workers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentReport {
    pub qualification_id: String,
    pub succeeded: Vec<String>,
    pub failed: Vec<AssignmentFailure>,
}

impl AssignmentReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A single failed assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentFailure {
    pub worker_id: String,
    pub error: String,
}

/// Marketplace operations on qualification types.
#[async_trait]
pub trait QualificationBackend: Send + Sync {
    /// List the caller's qualification types matching a search query.
    ///
    /// The query is a fuzzy server-side search; callers needing an exact
    /// name match filter the results themselves.
    async fn list_qualification_types(
        &self,
        query: &str,
    ) -> Result<Vec<QualificationRecord>, ProviderError>;

    /// Create a new active qualification type.
    async fn create_qualification_type(
        &self,
        spec: &NewQualification,
    ) -> Result<QualificationRecord, ProviderError>;

    /// Grant a qualification to one worker.
    async fn associate_with_worker(
        &self,
        qualification_id: &str,
        worker_id: &str,
        notify: bool,
    ) -> Result<(), ProviderError>;
}
