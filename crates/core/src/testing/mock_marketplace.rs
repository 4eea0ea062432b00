//! Mock marketplace for testing.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::provider::{
    Acknowledgement, DeploymentProvider, DeploymentRecord, ListFilter, Marketplace,
    ProlificProject, ProlificWorkspace, ProviderError, TransitionAction, WorkspaceDirectory,
};
use crate::qualification::{NewQualification, QualificationBackend, QualificationRecord};

/// A recorded provider call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    Create(Value),
    Patch { id: String, payload: Value },
    List(ListFilter),
    Transition { id: String, action: TransitionAction },
}

/// A recorded qualification assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAssignment {
    pub qualification_id: String,
    pub worker_id: String,
    pub notify: bool,
}

/// Mock implementation of the marketplace traits.
///
/// Provides controllable behavior for testing:
/// - Track every create/patch/list/transition call
/// - Seed existing deployments, qualifications, workspaces and projects
/// - Simulate failures of a single call, the n-th create, or per-worker
///   assignments
///
/// # Example
///
/// ```rust,ignore
/// let mock = MockMarketplace::prolific();
/// mock.add_deployment(DeploymentRecord { .. }).await;
/// mock.fail_create_at(2).await;
///
/// // ... run a workflow ...
///
/// assert_eq!(mock.created().await.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockMarketplace {
    marketplace: Marketplace,
    /// Recorded deployment calls.
    calls: Arc<RwLock<Vec<ProviderCall>>>,
    /// Deployments the marketplace knows about.
    deployments: Arc<RwLock<Vec<DeploymentRecord>>>,
    qualifications: Arc<RwLock<Vec<QualificationRecord>>>,
    assignments: Arc<RwLock<Vec<RecordedAssignment>>>,
    workspaces: Arc<RwLock<Vec<ProlificWorkspace>>>,
    projects: Arc<RwLock<Vec<(String, ProlificProject)>>>,
    /// Workers whose assignment always fails.
    failing_workers: Arc<RwLock<HashSet<String>>>,
    /// 1-based create call that fails.
    fail_create_at: Arc<RwLock<Option<usize>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<ProviderError>>>,
    /// Counter for generating unique ids.
    id_counter: Arc<RwLock<u32>>,
}

impl MockMarketplace {
    /// Create a mock for the given marketplace.
    pub fn new(marketplace: Marketplace) -> Self {
        Self {
            marketplace,
            calls: Arc::new(RwLock::new(Vec::new())),
            deployments: Arc::new(RwLock::new(Vec::new())),
            qualifications: Arc::new(RwLock::new(Vec::new())),
            assignments: Arc::new(RwLock::new(Vec::new())),
            workspaces: Arc::new(RwLock::new(Vec::new())),
            projects: Arc::new(RwLock::new(Vec::new())),
            failing_workers: Arc::new(RwLock::new(HashSet::new())),
            fail_create_at: Arc::new(RwLock::new(None)),
            next_error: Arc::new(RwLock::new(None)),
            id_counter: Arc::new(RwLock::new(0)),
        }
    }

    pub fn mturk() -> Self {
        Self::new(Marketplace::Mturk)
    }

    pub fn prolific() -> Self {
        Self::new(Marketplace::Prolific)
    }

    /// Get all recorded deployment calls.
    pub async fn calls(&self) -> Vec<ProviderCall> {
        self.calls.read().await.clone()
    }

    /// Payloads of recorded create calls.
    pub async fn created(&self) -> Vec<Value> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                ProviderCall::Create(payload) => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    /// Recorded patch calls as `(id, payload)`.
    pub async fn patched(&self) -> Vec<(String, Value)> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|c| match c {
                ProviderCall::Patch { id, payload } => Some((id.clone(), payload.clone())),
                _ => None,
            })
            .collect()
    }

    pub async fn add_deployment(&self, record: DeploymentRecord) {
        self.deployments.write().await.push(record);
    }

    pub async fn deployments(&self) -> Vec<DeploymentRecord> {
        self.deployments.read().await.clone()
    }

    pub async fn add_qualification(&self, record: QualificationRecord) {
        self.qualifications.write().await.push(record);
    }

    pub async fn qualifications(&self) -> Vec<QualificationRecord> {
        self.qualifications.read().await.clone()
    }

    pub async fn assignments(&self) -> Vec<RecordedAssignment> {
        self.assignments.read().await.clone()
    }

    pub async fn add_workspace(&self, workspace: ProlificWorkspace) {
        self.workspaces.write().await.push(workspace);
    }

    pub async fn add_project(&self, workspace_id: &str, project: ProlificProject) {
        self.projects
            .write()
            .await
            .push((workspace_id.to_string(), project));
    }

    /// Make every assignment to `worker_id` fail.
    pub async fn fail_assignment_for(&self, worker_id: &str) {
        self.failing_workers
            .write()
            .await
            .insert(worker_id.to_string());
    }

    /// Make the n-th create call (1-based) fail.
    pub async fn fail_create_at(&self, n: usize) {
        *self.fail_create_at.write().await = Some(n);
    }

    /// Set an error to be returned on the next operation.
    pub async fn set_next_error(&self, error: ProviderError) {
        *self.next_error.write().await = Some(error);
    }

    async fn check_error(&self) -> Result<(), ProviderError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(())
    }

    async fn next_id(&self, prefix: &str) -> String {
        let mut counter = self.id_counter.write().await;
        *counter += 1;
        format!("{}{:04}", prefix, *counter)
    }

    async fn record(&self, call: ProviderCall) {
        self.calls.write().await.push(call);
    }

    fn rejected(message: &str) -> ProviderError {
        ProviderError::ApiError {
            status: 400,
            message: "Bad Request".to_string(),
            detail: Some(message.to_string()),
        }
    }
}

fn field(payload: &Value, name: &str) -> Option<String> {
    payload.get(name).and_then(Value::as_str).map(str::to_string)
}

#[async_trait]
impl DeploymentProvider for MockMarketplace {
    fn marketplace(&self) -> Marketplace {
        self.marketplace
    }

    async fn create(&self, payload: &Value) -> Result<String, ProviderError> {
        self.record(ProviderCall::Create(payload.clone())).await;
        self.check_error().await?;

        let attempt = self.created().await.len();
        if *self.fail_create_at.read().await == Some(attempt) {
            return Err(Self::rejected("create rejected by mock"));
        }

        let (id, record) = match self.marketplace {
            Marketplace::Prolific => {
                let id = self.next_id("study").await;
                let record = DeploymentRecord {
                    id: id.clone(),
                    title: field(payload, "name"),
                    name: field(payload, "internal_name"),
                    status: Some("UNPUBLISHED".to_string()),
                };
                (id, record)
            }
            Marketplace::Mturk => {
                let id = self.next_id("HIT").await;
                let record = DeploymentRecord {
                    id: id.clone(),
                    title: field(payload, "Title"),
                    name: field(payload, "RequesterAnnotation"),
                    status: Some("Assignable".to_string()),
                };
                (id, record)
            }
        };

        self.deployments.write().await.push(record);
        Ok(id)
    }

    async fn patch(&self, id: &str, payload: &Value) -> Result<String, ProviderError> {
        self.record(ProviderCall::Patch {
            id: id.to_string(),
            payload: payload.clone(),
        })
        .await;
        self.check_error().await?;

        let known = self.deployments.read().await.iter().any(|d| d.id == id);
        if !known {
            return Err(ProviderError::ApiError {
                status: 404,
                message: "Not Found".to_string(),
                detail: Some(format!("no deployment {}", id)),
            });
        }
        Ok(id.to_string())
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<DeploymentRecord>, ProviderError> {
        self.record(ProviderCall::List(filter.clone())).await;
        self.check_error().await?;

        let records = self
            .deployments
            .read()
            .await
            .iter()
            .filter(|d| {
                filter
                    .name
                    .as_ref()
                    .map_or(true, |n| d.name.as_deref() == Some(n.as_str()))
            })
            .filter(|d| {
                filter.states.is_empty()
                    || d.status
                        .as_ref()
                        .map_or(false, |s| filter.states.contains(s))
            })
            .cloned()
            .collect();
        Ok(records)
    }

    async fn transition(
        &self,
        id: &str,
        action: TransitionAction,
    ) -> Result<Acknowledgement, ProviderError> {
        self.record(ProviderCall::Transition {
            id: id.to_string(),
            action,
        })
        .await;
        self.check_error().await?;

        let status = match action {
            TransitionAction::Publish | TransitionAction::Start => "ACTIVE",
            TransitionAction::Pause => "PAUSED",
            TransitionAction::Stop => "COMPLETED",
        };

        let mut deployments = self.deployments.write().await;
        let deployment = deployments
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| ProviderError::ApiError {
                status: 404,
                message: "Not Found".to_string(),
                detail: Some(format!("no deployment {}", id)),
            })?;
        deployment.status = Some(status.to_string());

        Ok(Acknowledgement {
            id: id.to_string(),
            action,
            status: Some(status.to_string()),
        })
    }
}

#[async_trait]
impl QualificationBackend for MockMarketplace {
    async fn list_qualification_types(
        &self,
        query: &str,
    ) -> Result<Vec<QualificationRecord>, ProviderError> {
        self.check_error().await?;
        // Fuzzy, like the real search.
        Ok(self
            .qualifications
            .read()
            .await
            .iter()
            .filter(|q| q.name.contains(query))
            .cloned()
            .collect())
    }

    async fn create_qualification_type(
        &self,
        spec: &NewQualification,
    ) -> Result<QualificationRecord, ProviderError> {
        self.check_error().await?;
        let record = QualificationRecord::new(self.next_id("QUAL").await, spec.name.clone());
        self.qualifications.write().await.push(record.clone());
        Ok(record)
    }

    async fn associate_with_worker(
        &self,
        qualification_id: &str,
        worker_id: &str,
        notify: bool,
    ) -> Result<(), ProviderError> {
        self.check_error().await?;
        if self.failing_workers.read().await.contains(worker_id) {
            return Err(Self::rejected(&format!("worker {} not found", worker_id)));
        }

        self.assignments.write().await.push(RecordedAssignment {
            qualification_id: qualification_id.to_string(),
            worker_id: worker_id.to_string(),
            notify,
        });
        if let Some(q) = self
            .qualifications
            .write()
            .await
            .iter_mut()
            .find(|q| q.id == qualification_id)
        {
            q.assigned_workers.insert(worker_id.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl WorkspaceDirectory for MockMarketplace {
    async fn workspaces(&self) -> Result<Vec<ProlificWorkspace>, ProviderError> {
        self.check_error().await?;
        Ok(self.workspaces.read().await.clone())
    }

    async fn projects(&self, workspace_id: &str) -> Result<Vec<ProlificProject>, ProviderError> {
        self.check_error().await?;
        Ok(self
            .projects
            .read()
            .await
            .iter()
            .filter(|(ws, _)| ws == workspace_id)
            .map(|(_, p)| p.clone())
            .collect())
    }
}
