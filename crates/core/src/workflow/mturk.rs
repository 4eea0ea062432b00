//! MTurk deployment: qualifications, question payload, batched HITs.

use std::sync::Arc;

use chrono::{DateTime, Local};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::batch::{base_token, plan_batches, DeploymentBatch};
use crate::config::{ConfigError, DurationSpec, MturkStudyConfig, StudyConfig};
use crate::decision::DecisionProvider;
use crate::eligibility::{EligibilityRequirement, EligibilityRuleBuilder};
use crate::history::{HistoryKey, HistoryStore};
use crate::payload::{QuestionPayloadBuilder, TaskPage};
use crate::provider::{DeploymentProvider, Marketplace};
use crate::qualification::{
    AssignmentReport, QualificationBackend, QualificationRecord, QualificationStateManager,
};

use super::{DeployError, MturkDecisionPlan, MturkDecisions};

/// Result of a completed MTurk deployment.
#[derive(Debug, Clone)]
pub struct MturkOutcome {
    pub batches: Vec<DeploymentBatch>,
    /// HIT ids in batch order.
    pub hit_ids: Vec<String>,
    /// The gate qualification (consent or compensation).
    pub qualification: QualificationRecord,
    /// Per-worker results of a compensation run.
    pub assignments: Option<AssignmentReport>,
}

/// Deploys a study to MTurk.
pub struct MturkDeployment {
    provider: Arc<dyn DeploymentProvider>,
    qualifications: QualificationStateManager,
    payloads: QuestionPayloadBuilder,
    history: HistoryStore,
    decisions: Arc<dyn DecisionProvider>,
    database_url: String,
    sandbox: bool,
}

impl MturkDeployment {
    pub fn new(
        provider: Arc<dyn DeploymentProvider>,
        qualifications: Arc<dyn QualificationBackend>,
        history: HistoryStore,
        decisions: Arc<dyn DecisionProvider>,
    ) -> Self {
        Self {
            provider,
            qualifications: QualificationStateManager::new(qualifications),
            payloads: QuestionPayloadBuilder::with_defaults(),
            history,
            decisions,
            database_url: String::new(),
            sandbox: false,
        }
    }

    pub fn with_payloads(mut self, payloads: QuestionPayloadBuilder) -> Self {
        self.payloads = payloads;
        self
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Run a full deployment.
    ///
    /// Batches are created one at a time and each HIT id is journaled as
    /// soon as it exists. A failed batch stops the run without touching the
    /// batches before it.
    pub async fn deploy(
        &self,
        experiment: &str,
        study: &StudyConfig,
        now: DateTime<Local>,
    ) -> Result<MturkOutcome, DeployError> {
        let mturk = study.mturk.as_ref().ok_or_else(|| {
            ConfigError::ValidationError("study config has no [mturk] section".to_string())
        })?;
        let places = study.places();
        if places == 0 {
            return Err(ConfigError::ValidationError(
                "total_available_places must be greater than 0".to_string(),
            )
            .into());
        }

        let decisions = MturkDecisionPlan::for_study(study, self.sandbox)
            .resolve(self.decisions.as_ref())
            .await?;

        let question = if study.compensation {
            self.payloads.build_compensation().await?
        } else {
            let task_url = self.history.latest_site_url(experiment).await?.ok_or_else(|| {
                DeployError::NoSite {
                    experiment: experiment.to_string(),
                }
            })?;
            let stamp = now.to_rfc2822();
            self.payloads
                .build(&TaskPage {
                    experiment,
                    task_url: &task_url,
                    database_url: &self.database_url,
                    title: &study.title,
                    description: &study.description,
                    stamp: &stamp,
                })
                .await?
        };

        let (qualification, assignments, requirements) = if study.compensation {
            self.compensation_gate(study, &decisions, &now).await?
        } else {
            let consent = self.consent_gate(experiment, mturk).await?;
            let requirements = EligibilityRuleBuilder::new(Marketplace::Mturk)
                .with_sandbox(self.sandbox)
                .build(&study.screeners, Some(&consent.id), &decisions.eligibility);
            (consent, None, requirements)
        };

        let mut request = hit_request(experiment, study, mturk, &question, &requirements)?;
        let batches = plan_batches(places, decisions.avoid_fee, &base_token(experiment, &now));
        let planned = batches.len() as u32;
        let mut hit_ids = Vec::with_capacity(batches.len());

        for batch in &batches {
            request["MaxAssignments"] = json!(batch.assignments);
            request["UniqueRequestToken"] = json!(batch.token);

            let hit_id = match self.provider.create(&request).await {
                Ok(id) => id,
                Err(source) => {
                    error!(
                        "Batch {}/{} ({}) failed: {}",
                        batch.index, planned, batch.token, source
                    );
                    return Err(DeployError::BatchFailed {
                        index: batch.index,
                        planned,
                        completed: hit_ids,
                        source,
                    });
                }
            };

            info!(
                "Created batch {}/{}: HIT {} with {} assignment(s)",
                batch.index, planned, hit_id, batch.assignments
            );
            self.history
                .append(experiment, &HistoryKey::HitId, &hit_id)
                .await?;
            hit_ids.push(hit_id);
        }

        Ok(MturkOutcome {
            batches,
            hit_ids,
            qualification,
            assignments,
        })
    }

    /// The experiment's consent qualification; holders have already taken
    /// part and are excluded.
    async fn consent_gate(
        &self,
        experiment: &str,
        mturk: &MturkStudyConfig,
    ) -> Result<QualificationRecord, DeployError> {
        let keywords: Vec<String> = std::iter::once("consent".to_string())
            .chain(
                mturk
                    .keywords
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string),
            )
            .collect();

        Ok(self
            .qualifications
            .create_if_absent(
                experiment,
                &format!(
                    "Assigned to workers who consent to participate in study '{}'",
                    experiment
                ),
                &keywords,
            )
            .await?)
    }

    async fn compensation_gate(
        &self,
        study: &StudyConfig,
        decisions: &MturkDecisions,
        now: &DateTime<Local>,
    ) -> Result<
        (
            QualificationRecord,
            Option<AssignmentReport>,
            Vec<EligibilityRequirement>,
        ),
        DeployError,
    > {
        let stamp = now.format("%Y%m%d_%H%M%S").to_string();
        let (record, report) = self
            .qualifications
            .create_compensation_gate(&study.workers_to_compensate, &stamp)
            .await?;

        if report.succeeded.is_empty() {
            return Err(DeployError::NoEligibleWorkers { report });
        }
        if !report.all_succeeded() {
            warn!(
                "{} of {} worker(s) did not receive qualification {}",
                report.failed.len(),
                study.workers_to_compensate.len(),
                record.id
            );
        }

        let requirements = if self.sandbox && decisions.eligibility.disable_in_sandbox {
            info!("Dropping compensation gate so the sandbox task can be previewed");
            Vec::new()
        } else {
            EligibilityRuleBuilder::compensation_gate(&record.id)
        };

        Ok((record, Some(report), requirements))
    }
}

/// `CreateHIT` request without the per-batch fields.
pub fn hit_request(
    experiment: &str,
    study: &StudyConfig,
    mturk: &MturkStudyConfig,
    question: &str,
    requirements: &[EligibilityRequirement],
) -> Result<Value, ConfigError> {
    let description = if study.description.summary_para.is_empty() {
        study.title.clone()
    } else {
        study.description.summary_para.join(" ")
    };

    Ok(json!({
        "Title": study.title,
        "Description": description,
        "Keywords": mturk.keywords,
        "Reward": mturk.reward,
        "AssignmentDurationInSeconds": seconds("allotted_time", &mturk.allotted_time)?,
        "LifetimeInSeconds": seconds("expiration", &mturk.expiration)?,
        "AutoApprovalDelayInSeconds": seconds("auto_approve", &mturk.auto_approve)?,
        "Question": question,
        "RequesterAnnotation": experiment,
        "QualificationRequirements": requirements,
    }))
}

fn seconds(name: &str, duration: &DurationSpec) -> Result<u64, ConfigError> {
    duration.as_seconds().ok_or_else(|| {
        ConfigError::ValidationError(format!("mturk.{} is too long: {:?}", name, duration))
    })
}
