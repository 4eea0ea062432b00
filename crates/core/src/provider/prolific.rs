//! Prolific API client.
//!
//! Authenticates every request with a static `Authorization: Token <token>`
//! header.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::ProlificSettings;

use super::{
    Acknowledgement, DeploymentProvider, DeploymentRecord, ListFilter, Marketplace,
    ProviderError, TransitionAction, WorkspaceDirectory,
};

/// Every study state Prolific reports.
pub const PROLIFIC_STUDY_STATES: [&str; 8] = [
    "ACTIVE",
    "PAUSED",
    "UNPUBLISHED",
    "PUBLISHING",
    "COMPLETED",
    "AWAITING REVIEW",
    "UNKNOWN",
    "SCHEDULED",
];

/// A Prolific workspace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProlificWorkspace {
    pub id: String,
    pub title: String,
}

/// A project inside a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProlificProject {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct ResultsPage<T> {
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct StudyResponse {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    internal_name: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl From<StudyResponse> for DeploymentRecord {
    fn from(s: StudyResponse) -> Self {
        Self {
            id: s.id,
            title: s.name,
            name: s.internal_name,
            status: s.status,
        }
    }
}

/// Prolific API client.
pub struct ProlificClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ProlificClient {
    /// Create a new Prolific client.
    pub fn new(settings: &ProlificSettings, token: String) -> Result<Self, ProviderError> {
        if token.is_empty() {
            return Err(ProviderError::NotConfigured(
                "Prolific API token is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs as u64))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.api_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(AUTHORIZATION, format!("Token {}", self.token))
    }

    /// Send a request and decode the JSON body, mapping failures to
    /// [`ProviderError::ApiError`] with Prolific's `error` payload as detail.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ProviderError> {
        let response = self.authorized(request).send().await?;

        let status = response.status();
        if status == 401 {
            return Err(ProviderError::NotConfigured(
                "Invalid Prolific API token".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
                detail: error_detail(&body),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Invalid Prolific response: {}", e)))
    }

    /// List workspaces visible to the token.
    pub async fn list_workspaces(&self) -> Result<Vec<ProlificWorkspace>, ProviderError> {
        let url = format!("{}/workspaces/", self.base_url);
        let page: ResultsPage<ProlificWorkspace> = self.send(self.client.get(&url)).await?;
        Ok(page.results)
    }

    /// List projects in a workspace.
    pub async fn list_projects(
        &self,
        workspace_id: &str,
    ) -> Result<Vec<ProlificProject>, ProviderError> {
        let url = format!("{}/workspaces/{}/projects/", self.base_url, workspace_id);
        let page: ResultsPage<ProlificProject> = self.send(self.client.get(&url)).await?;
        Ok(page.results)
    }
}

/// Extract Prolific's `error` field from a response body, falling back to the
/// raw body.
fn error_detail(body: &str) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("error") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => Some(body.to_string()),
        },
        _ => Some(body.to_string()),
    }
}

/// State query in the `(A|B|C)` form the studies endpoint expects.
fn state_query(states: &[String]) -> String {
    if states.is_empty() {
        format!("({})", PROLIFIC_STUDY_STATES.join("|"))
    } else {
        format!("({})", states.join("|"))
    }
}

#[async_trait]
impl DeploymentProvider for ProlificClient {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Prolific
    }

    async fn create(&self, payload: &Value) -> Result<String, ProviderError> {
        let url = format!("{}/studies/", self.base_url);
        debug!("Prolific create study");

        let study: StudyResponse = self.send(self.client.post(&url).json(payload)).await?;
        info!("Created Prolific draft study {}", study.id);
        Ok(study.id)
    }

    async fn patch(&self, id: &str, payload: &Value) -> Result<String, ProviderError> {
        let url = format!("{}/studies/{}/", self.base_url, id);
        debug!("Prolific patch study {}", id);

        let study: StudyResponse = self.send(self.client.patch(&url).json(payload)).await?;
        Ok(study.id)
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<DeploymentRecord>, ProviderError> {
        let url = format!("{}/studies/", self.base_url);
        let state = state_query(&filter.states);
        debug!("Prolific list studies: state={}, name={:?}", state, filter.name);

        let page: ResultsPage<StudyResponse> = self
            .send(self.client.get(&url).query(&[("state", state.as_str())]))
            .await?;

        let records = page
            .results
            .into_iter()
            .map(DeploymentRecord::from)
            .filter(|r| match &filter.name {
                Some(name) => r.name.as_deref() == Some(name.as_str()),
                None => true,
            })
            .collect();

        Ok(records)
    }

    async fn transition(
        &self,
        id: &str,
        action: TransitionAction,
    ) -> Result<Acknowledgement, ProviderError> {
        let url = format!("{}/studies/{}/transition/", self.base_url, id);
        debug!("Prolific transition study {}: {}", id, action.as_str());

        let body: Value = self
            .send(
                self.client
                    .post(&url)
                    .json(&json!({ "action": action.as_str() })),
            )
            .await?;

        Ok(Acknowledgement {
            id: id.to_string(),
            action,
            status: body
                .get("status")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

#[async_trait]
impl WorkspaceDirectory for ProlificClient {
    async fn workspaces(&self) -> Result<Vec<ProlificWorkspace>, ProviderError> {
        self.list_workspaces().await
    }

    async fn projects(&self, workspace_id: &str) -> Result<Vec<ProlificProject>, ProviderError> {
        self.list_projects(workspace_id).await
    }
}
