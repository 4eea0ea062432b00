//! MTurk requester API client.
//!
//! Speaks the JSON protocol of the requester service. Every call is signed
//! with SigV4 before it is sent.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::MturkSettings;
use crate::qualification::{NewQualification, QualificationBackend, QualificationRecord};

use super::{
    Acknowledgement, DeploymentProvider, DeploymentRecord, ListFilter, Marketplace,
    ProviderError, RequestSigner, TransitionAction,
};

/// Target prefix of every requester operation.
pub const MTURK_API_VERSION: &str = "MTurkRequesterServiceV20170117";

const PAGE_SIZE: u32 = 100;

const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateHitResponse {
    #[serde(rename = "HIT")]
    hit: HitResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HitResponse {
    #[serde(rename = "HITId")]
    hit_id: String,
    #[serde(rename = "HITGroupId", default)]
    hit_group_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    requester_annotation: Option<String>,
    #[serde(rename = "HITStatus", default)]
    hit_status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListHitsResponse {
    #[serde(rename = "HITs", default)]
    hits: Vec<HitResponse>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct QualificationTypeResponse {
    qualification_type_id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListQualificationTypesResponse {
    #[serde(default)]
    qualification_types: Vec<QualificationTypeResponse>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateQualificationTypeResponse {
    qualification_type: QualificationTypeResponse,
}

impl From<QualificationTypeResponse> for QualificationRecord {
    fn from(q: QualificationTypeResponse) -> Self {
        QualificationRecord::new(q.qualification_type_id, q.name)
    }
}

/// MTurk requester client.
pub struct MturkClient {
    client: Client,
    signer: RequestSigner,
    endpoint: String,
    preview_url: String,
}

impl MturkClient {
    pub fn new(
        client: Client,
        signer: RequestSigner,
        endpoint: impl Into<String>,
        preview_url: impl Into<String>,
    ) -> Self {
        let endpoint = endpoint.into();
        Self {
            client,
            signer,
            endpoint: format!("{}/", endpoint.trim_end_matches('/')),
            preview_url: preview_url.into(),
        }
    }

    /// Client for the production or sandbox requester endpoint.
    pub fn from_settings(
        client: Client,
        signer: RequestSigner,
        settings: &MturkSettings,
        sandbox: bool,
    ) -> Self {
        Self::new(
            client,
            signer,
            settings.endpoint_for(sandbox),
            settings.preview_url_for(sandbox),
        )
    }

    /// Worker-facing preview link for a HIT group.
    pub fn preview_link(&self, group_id: &str) -> String {
        format!("{}{}", self.preview_url, group_id)
    }

    /// Invoke one requester operation.
    async fn call<T: DeserializeOwned>(
        &self,
        operation: &str,
        body: &Value,
    ) -> Result<T, ProviderError> {
        debug!("MTurk {}", operation);

        let target = format!("{}.{}", MTURK_API_VERSION, operation);
        let payload = serde_json::to_vec(body).map_err(|e| {
            ProviderError::ParseError(format!("Invalid {} request: {}", operation, e))
        })?;
        let signed = self
            .signer
            .sign(
                &self.endpoint,
                &[
                    (CONTENT_TYPE.as_str(), JSON_CONTENT_TYPE),
                    ("x-amz-target", target.as_str()),
                ],
                &payload,
            )
            .await?;

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("X-Amz-Target", &target)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE);
        for (name, value) in signed {
            request = request.header(name, value);
        }
        let response = request.body(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let (message, detail) = error_parts(&text);
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: message.unwrap_or_else(|| format!("{} failed", operation)),
                detail,
            });
        }

        response.json().await.map_err(|e| {
            ProviderError::ParseError(format!("Invalid {} response: {}", operation, e))
        })
    }

    /// Expire a HIT immediately.
    async fn expire(&self, id: &str) -> Result<(), ProviderError> {
        let _: Value = self
            .call(
                "UpdateExpirationForHIT",
                &json!({ "HITId": id, "ExpireAt": 0 }),
            )
            .await?;
        Ok(())
    }
}

/// Split an MTurk error body into its message and the full provider detail.
fn error_parts(body: &str) -> (Option<String>, Option<String>) {
    if body.is_empty() {
        return (None, None);
    }
    let message = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.get("Message")
            .or_else(|| v.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    (message, Some(body.to_string()))
}

#[async_trait]
impl DeploymentProvider for MturkClient {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Mturk
    }

    async fn create(&self, payload: &Value) -> Result<String, ProviderError> {
        let created: CreateHitResponse = self.call("CreateHIT", payload).await?;
        let hit = created.hit;

        match &hit.hit_group_id {
            Some(group) => info!(
                "Created HIT {} (preview: {})",
                hit.hit_id,
                self.preview_link(group)
            ),
            None => info!("Created HIT {}", hit.hit_id),
        }

        Ok(hit.hit_id)
    }

    async fn patch(&self, id: &str, payload: &Value) -> Result<String, ProviderError> {
        if let Some(expire_at) = payload.get("ExpireAt") {
            let _: Value = self
                .call(
                    "UpdateExpirationForHIT",
                    &json!({ "HITId": id, "ExpireAt": expire_at }),
                )
                .await?;
            return Ok(id.to_string());
        }

        if let Some(hit_type) = payload.get("HITTypeId") {
            let _: Value = self
                .call(
                    "UpdateHITTypeOfHIT",
                    &json!({ "HITId": id, "HITTypeId": hit_type }),
                )
                .await?;
            return Ok(id.to_string());
        }

        Err(ProviderError::Unsupported {
            marketplace: Marketplace::Mturk,
            operation: "patch without ExpireAt or HITTypeId".to_string(),
        })
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<DeploymentRecord>, ProviderError> {
        let mut records = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut body = json!({ "MaxResults": PAGE_SIZE });
            if let Some(token) = &next_token {
                body["NextToken"] = json!(token);
            }

            let page: ListHitsResponse = self.call("ListHITs", &body).await?;
            records.extend(page.hits.into_iter().map(|h| DeploymentRecord {
                id: h.hit_id,
                title: h.title,
                name: h.requester_annotation,
                status: h.hit_status,
            }));

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        records.retain(|r| {
            let name_ok = filter
                .name
                .as_ref()
                .map_or(true, |n| r.name.as_deref() == Some(n.as_str()));
            let state_ok = filter.states.is_empty()
                || r.status
                    .as_ref()
                    .map_or(false, |s| filter.states.iter().any(|f| f == s));
            name_ok && state_ok
        });

        Ok(records)
    }

    async fn transition(
        &self,
        id: &str,
        action: TransitionAction,
    ) -> Result<Acknowledgement, ProviderError> {
        match action {
            // HITs are live as soon as they are created.
            TransitionAction::Publish => Ok(Acknowledgement {
                id: id.to_string(),
                action,
                status: Some("Assignable".to_string()),
            }),
            TransitionAction::Stop => {
                self.expire(id).await?;
                Ok(Acknowledgement {
                    id: id.to_string(),
                    action,
                    status: Some("Expired".to_string()),
                })
            }
            TransitionAction::Pause | TransitionAction::Start => Err(ProviderError::Unsupported {
                marketplace: Marketplace::Mturk,
                operation: format!("transition {}", action.as_str()),
            }),
        }
    }
}

#[async_trait]
impl QualificationBackend for MturkClient {
    async fn list_qualification_types(
        &self,
        query: &str,
    ) -> Result<Vec<QualificationRecord>, ProviderError> {
        let mut records = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut body = json!({
                "Query": query,
                // Include our own types whether or not they are requestable.
                "MustBeRequestable": false,
                "MustBeOwnedByCaller": true,
                "MaxResults": PAGE_SIZE,
            });
            if let Some(token) = &next_token {
                body["NextToken"] = json!(token);
            }

            let page: ListQualificationTypesResponse =
                self.call("ListQualificationTypes", &body).await?;
            records.extend(page.qualification_types.into_iter().map(Into::into));

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        Ok(records)
    }

    async fn create_qualification_type(
        &self,
        spec: &NewQualification,
    ) -> Result<QualificationRecord, ProviderError> {
        let created: CreateQualificationTypeResponse = self
            .call(
                "CreateQualificationType",
                &json!({
                    "Name": spec.name,
                    "Description": spec.description,
                    "Keywords": spec.keywords.join(", "),
                    "QualificationTypeStatus": "Active",
                }),
            )
            .await?;

        Ok(created.qualification_type.into())
    }

    async fn associate_with_worker(
        &self,
        qualification_id: &str,
        worker_id: &str,
        notify: bool,
    ) -> Result<(), ProviderError> {
        let _: Value = self
            .call(
                "AssociateQualificationWithWorker",
                &json!({
                    "QualificationTypeId": qualification_id,
                    "WorkerId": worker_id,
                    "SendNotification": notify,
                    "IntegerValue": 1,
                }),
            )
            .await?;
        Ok(())
    }
}
