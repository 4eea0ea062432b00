//! Prolific deployment: draft studies and publishing.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::config::{ConfigError, ProlificStudyConfig, StudyConfig};
use crate::decision::{
    select_or_only, Choice, ChoiceOption, Confirmation, DecisionError, DecisionKey,
    DecisionProvider,
};
use crate::eligibility::{EligibilityChoices, EligibilityRequirement, EligibilityRuleBuilder};
use crate::history::{HistoryKey, HistoryStore};
use crate::payload::description_html;
use crate::provider::{
    Acknowledgement, DeploymentProvider, DeploymentRecord, ListFilter, Marketplace,
    TransitionAction, WorkspaceDirectory,
};

use super::DeployError;

/// Completion code participants are redirected with.
pub const COMPLETION_CODE: &str = "OUVRAI";

/// Researcher-side preview page of a study.
pub const PROLIFIC_STUDY_PREVIEW: &str = "https://app.prolific.co/researcher/workspaces/studies/";

const PARTICIPANT_PARAMS: &str =
    "PROLIFIC_PID={{%PROLIFIC_PID%}}&STUDY_ID={{%STUDY_ID%}}&SESSION_ID={{%SESSION_ID%}}";

const DRAFT_STATE: &str = "UNPUBLISHED";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionAction {
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionCode {
    pub code: String,
    pub code_type: String,
    pub actions: Vec<CompletionAction>,
}

/// Study object sent to the studies endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ProlificStudy {
    pub name: String,
    pub internal_name: String,
    pub description: String,
    pub external_study_url: String,
    pub prolific_id_option: String,
    pub completion_option: String,
    pub completion_codes: Vec<CompletionCode>,
    pub total_available_places: u32,
    pub estimated_completion_time: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_allowed_time: Option<u32>,
    /// Cents.
    pub reward: u32,
    pub device_compatibility: Vec<String>,
    pub peripheral_requirements: Vec<String>,
    pub eligibility_requirements: Vec<EligibilityRequirement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub naivety_distribution_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

impl ProlificStudy {
    pub fn new(
        experiment: &str,
        study_url: &str,
        study: &StudyConfig,
        prolific: &ProlificStudyConfig,
    ) -> Self {
        let eligibility_requirements = EligibilityRuleBuilder::new(Marketplace::Prolific).build(
            &study.screeners,
            None,
            &EligibilityChoices::default(),
        );

        Self {
            name: study.title.clone(),
            internal_name: experiment.to_string(),
            description: description_html(&study.description),
            external_study_url: format!("{}?{}", study_url, PARTICIPANT_PARAMS),
            prolific_id_option: "url_parameters".to_string(),
            completion_option: "url".to_string(),
            completion_codes: vec![CompletionCode {
                code: COMPLETION_CODE.to_string(),
                code_type: "COMPLETED".to_string(),
                actions: vec![CompletionAction {
                    action: "MANUALLY_REVIEW".to_string(),
                }],
            }],
            total_available_places: study.places(),
            estimated_completion_time: prolific.estimated_completion_time,
            maximum_allowed_time: prolific.maximum_allowed_time,
            reward: prolific.reward,
            device_compatibility: prolific.compatible_devices.clone(),
            peripheral_requirements: Vec::new(),
            eligibility_requirements,
            naivety_distribution_rate: prolific.naivety,
            project: prolific.project.clone(),
        }
    }
}

/// Patch applied right after creating a draft; the API does not keep the
/// completion code from the create call.
pub fn completion_code_patch() -> Value {
    json!({
        "completion_code": COMPLETION_CODE,
        "completion_code_action": "MANUALLY_REVIEW",
    })
}

/// A draft study as left by [`ProlificDeployment::draft`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProlificDraft {
    pub id: String,
    /// An existing draft was patched instead of a new one created.
    pub updated: bool,
    pub preview_url: String,
}

/// Creates and publishes Prolific studies.
pub struct ProlificDeployment {
    provider: Arc<dyn DeploymentProvider>,
    directory: Arc<dyn WorkspaceDirectory>,
    history: HistoryStore,
    decisions: Arc<dyn DecisionProvider>,
}

impl ProlificDeployment {
    pub fn new(
        provider: Arc<dyn DeploymentProvider>,
        directory: Arc<dyn WorkspaceDirectory>,
        history: HistoryStore,
        decisions: Arc<dyn DecisionProvider>,
    ) -> Self {
        Self {
            provider,
            directory,
            history,
            decisions,
        }
    }

    /// Create a draft study, or update one of the experiment's existing drafts.
    pub async fn draft(
        &self,
        experiment: &str,
        study: &StudyConfig,
    ) -> Result<ProlificDraft, DeployError> {
        let prolific = study.prolific.as_ref().ok_or_else(|| {
            ConfigError::ValidationError("study config has no [prolific] section".to_string())
        })?;
        let study_url = self
            .history
            .latest_site_url(experiment)
            .await?
            .ok_or_else(|| DeployError::NoSite {
                experiment: experiment.to_string(),
            })?;

        let target = self.existing_draft(experiment).await?;
        let mut object = ProlificStudy::new(experiment, &study_url, study, prolific);

        let (id, updated) = match target {
            Some(id) => {
                info!("Updating Prolific draft {}", id);
                let payload = serde_json::to_value(&object).map_err(json_error)?;
                (self.provider.patch(&id, &payload).await?, true)
            }
            None => {
                if object.project.is_none() {
                    object.project = Some(self.select_project().await?);
                }
                let payload = serde_json::to_value(&object).map_err(json_error)?;
                let id = self.provider.create(&payload).await?;
                self.provider.patch(&id, &completion_code_patch()).await?;
                (id, false)
            }
        };

        self.history
            .append(experiment, &HistoryKey::study_id(), &id)
            .await?;

        let preview_url = format!("{}{}", PROLIFIC_STUDY_PREVIEW, id);
        info!("Draft study {} ready, preview it at {}", id, preview_url);
        Ok(ProlificDraft {
            id,
            updated,
            preview_url,
        })
    }

    /// Publish one study after a paid-post confirmation.
    pub async fn publish(&self, study_id: &str) -> Result<Acknowledgement, DeployError> {
        self.confirm_paid_post().await?;
        let ack = self
            .provider
            .transition(study_id, TransitionAction::Publish)
            .await?;
        info!("Published Prolific study {}", study_id);
        Ok(ack)
    }

    /// Publish the experiment's drafts. With several drafts the user picks
    /// which ones; a single confirmation covers all of them.
    pub async fn publish_drafts(
        &self,
        experiment: &str,
    ) -> Result<Vec<Acknowledgement>, DeployError> {
        let drafts = self.drafts(experiment).await?;

        let chosen: Vec<String> = match drafts.as_slice() {
            [] => {
                return Err(DeployError::NothingToPublish {
                    experiment: experiment.to_string(),
                })
            }
            [only] => vec![only.id.clone()],
            _ => {
                let choice = Choice::new(
                    DecisionKey::SelectStudy,
                    "Which drafts should be published?",
                    draft_options(&drafts),
                );
                self.decisions.multi_select(&choice).await?
            }
        };
        if chosen.is_empty() {
            return Err(DeployError::Declined("No study was selected".to_string()));
        }
        if let Some(unknown) = chosen
            .iter()
            .find(|id| !drafts.iter().any(|d| &d.id == *id))
        {
            return Err(DecisionError::InvalidAnswer {
                key: DecisionKey::SelectStudy,
                answer: unknown.clone(),
            }
            .into());
        }

        self.confirm_paid_post().await?;

        let mut acks = Vec::with_capacity(chosen.len());
        for id in &chosen {
            acks.push(
                self.provider
                    .transition(id, TransitionAction::Publish)
                    .await?,
            );
            info!("Published Prolific study {}", id);
        }
        Ok(acks)
    }

    async fn drafts(&self, experiment: &str) -> Result<Vec<DeploymentRecord>, DeployError> {
        let filter = ListFilter {
            name: Some(experiment.to_string()),
            states: vec![DRAFT_STATE.to_string()],
        };
        Ok(self.provider.list(&filter).await?)
    }

    /// Draft to update, when drafts exist and the user wants to reuse one.
    async fn existing_draft(&self, experiment: &str) -> Result<Option<String>, DeployError> {
        let drafts = self.drafts(experiment).await?;
        if drafts.is_empty() {
            return Ok(None);
        }

        let update = self
            .decisions
            .confirm(&Confirmation::new(
                DecisionKey::UpdateExistingStudy,
                format!(
                    "Found {} unpublished draft(s) for '{}'. Update an existing draft instead of creating a new one?",
                    drafts.len(),
                    experiment
                ),
                true,
            ))
            .await?;
        if !update {
            return Ok(None);
        }

        let choice = Choice::new(
            DecisionKey::SelectStudy,
            "Which draft should be updated?",
            draft_options(&drafts),
        );
        Ok(Some(select_or_only(self.decisions.as_ref(), &choice).await?))
    }

    async fn select_project(&self) -> Result<String, DeployError> {
        let workspaces = self.directory.workspaces().await?;
        let workspace = select_or_only(
            self.decisions.as_ref(),
            &Choice::new(
                DecisionKey::SelectWorkspace,
                "Please choose a workspace:",
                workspaces
                    .iter()
                    .map(|w| ChoiceOption::new(&w.title, &w.id))
                    .collect(),
            ),
        )
        .await?;

        let projects = self.directory.projects(&workspace).await?;
        Ok(select_or_only(
            self.decisions.as_ref(),
            &Choice::new(
                DecisionKey::SelectProject,
                "Please choose a project:",
                projects
                    .iter()
                    .map(|p| ChoiceOption::new(&p.title, &p.id))
                    .collect(),
            ),
        )
        .await?)
    }

    async fn confirm_paid_post(&self) -> Result<(), DeployError> {
        let confirmed = self
            .decisions
            .confirm(&Confirmation::new(
                DecisionKey::ConfirmPaidPost,
                "You are about to post a study on Prolific, which will cost money! Are you sure you want to do this?",
                false,
            ))
            .await?;
        if confirmed {
            Ok(())
        } else {
            Err(DeployError::Declined(
                "Your study has NOT been posted to Prolific".to_string(),
            ))
        }
    }
}

fn draft_options(drafts: &[DeploymentRecord]) -> Vec<ChoiceOption> {
    drafts
        .iter()
        .map(|d| {
            let label = match &d.title {
                Some(title) => format!("{} ({})", title, d.id),
                None => d.id.clone(),
            };
            ChoiceOption::new(label, &d.id)
        })
        .collect()
}

fn json_error(e: serde_json::Error) -> DeployError {
    DeployError::Config(ConfigError::ValidationError(format!(
        "study object cannot be serialized: {}",
        e
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApprovalRateCutoff;
    use crate::testing::{fixtures, MockMarketplace, ProviderCall, ScriptedDecisions};
    use tempfile::TempDir;

    struct Harness {
        mock: Arc<MockMarketplace>,
        history: HistoryStore,
        _dir: TempDir,
    }

    impl Harness {
        async fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let history = HistoryStore::new(dir.path());
            history
                .append("reach", &HistoryKey::SiteId, "reach-lab")
                .await
                .unwrap();
            let mock = Arc::new(MockMarketplace::prolific());
            mock.add_workspace(fixtures::workspace("WS1", "Lab")).await;
            mock.add_project("WS1", fixtures::project("P1", "Pilot")).await;
            Self {
                mock,
                history,
                _dir: dir,
            }
        }

        fn deployment(&self, decisions: ScriptedDecisions) -> ProlificDeployment {
            ProlificDeployment::new(
                Arc::clone(&self.mock) as Arc<dyn DeploymentProvider>,
                Arc::clone(&self.mock) as Arc<dyn WorkspaceDirectory>,
                self.history.clone(),
                Arc::new(decisions),
            )
        }

        async fn add_draft(&self, id: &str) {
            self.mock
                .add_deployment(DeploymentRecord {
                    id: id.to_string(),
                    title: Some("Reach task".to_string()),
                    name: Some("reach".to_string()),
                    status: Some(DRAFT_STATE.to_string()),
                })
                .await;
        }
    }

    #[test]
    fn test_study_object_shape() {
        let mut study = fixtures::study(30);
        study.screeners.age_range = Some([18, 40]);
        study.screeners.restrict_approval_rate = Some(ApprovalRateCutoff::Percent(95.0));
        let prolific = fixtures::prolific_config();

        let object = ProlificStudy::new("reach", "https://reach-lab.web.app", &study, &prolific);
        let json = serde_json::to_value(&object).unwrap();

        assert_eq!(json["internal_name"], "reach");
        assert_eq!(
            json["external_study_url"],
            "https://reach-lab.web.app?PROLIFIC_PID={{%PROLIFIC_PID%}}&STUDY_ID={{%STUDY_ID%}}&SESSION_ID={{%SESSION_ID%}}"
        );
        assert_eq!(json["completion_codes"][0]["code"], "OUVRAI");
        assert_eq!(
            json["completion_codes"][0]["actions"][0]["action"],
            "MANUALLY_REVIEW"
        );
        assert_eq!(json["total_available_places"], 30);
        assert_eq!(json["reward"], 300);
        assert_eq!(json["eligibility_requirements"].as_array().unwrap().len(), 2);
        assert!(json.get("project").is_none());
        assert!(json.get("naivety_distribution_rate").is_none());
        assert!(json["description"].as_str().unwrap().contains("<h2>Summary</h2>"));
    }

    #[tokio::test]
    async fn test_new_draft_selects_project_and_patches_completion_code() {
        let h = Harness::new().await;

        let draft = h
            .deployment(ScriptedDecisions::new())
            .draft("reach", &fixtures::study(30))
            .await
            .unwrap();

        assert!(!draft.updated);
        assert_eq!(draft.preview_url, format!("{}{}", PROLIFIC_STUDY_PREVIEW, draft.id));

        let created = h.mock.created().await;
        assert_eq!(created.len(), 1);
        assert_eq!(created[0]["project"], "P1");

        let patched = h.mock.patched().await;
        assert_eq!(patched, vec![(draft.id.clone(), completion_code_patch())]);

        assert_eq!(
            h.history.latest("reach", &HistoryKey::study_id()).await.unwrap(),
            Some(draft.id)
        );
    }

    #[tokio::test]
    async fn test_configured_project_skips_selection() {
        let h = Harness::new().await;
        let mut study = fixtures::study(30);
        if let Some(p) = study.prolific.as_mut() {
            p.project = Some("PCONF".to_string());
        }
        let decisions = ScriptedDecisions::new();

        h.deployment(decisions.clone())
            .draft("reach", &study)
            .await
            .unwrap();

        assert_eq!(h.mock.created().await[0]["project"], "PCONF");
        assert!(decisions.asked().await.is_empty());
    }

    #[tokio::test]
    async fn test_existing_draft_is_updated_on_request() {
        let h = Harness::new().await;
        h.add_draft("S1").await;
        h.add_draft("S2").await;
        let decisions = ScriptedDecisions::new()
            .answer(DecisionKey::UpdateExistingStudy, true)
            .choose(DecisionKey::SelectStudy, "S2");

        let draft = h
            .deployment(decisions)
            .draft("reach", &fixtures::study(30))
            .await
            .unwrap();

        assert!(draft.updated);
        assert_eq!(draft.id, "S2");
        assert!(h.mock.created().await.is_empty());
        let patched = h.mock.patched().await;
        assert_eq!(patched.len(), 1);
        assert_eq!(patched[0].0, "S2");
        assert_eq!(patched[0].1["internal_name"], "reach");
    }

    #[tokio::test]
    async fn test_declining_update_creates_new_draft() {
        let h = Harness::new().await;
        h.add_draft("S1").await;
        let decisions = ScriptedDecisions::new().answer(DecisionKey::UpdateExistingStudy, false);

        let draft = h
            .deployment(decisions)
            .draft("reach", &fixtures::study(30))
            .await
            .unwrap();

        assert!(!draft.updated);
        assert_ne!(draft.id, "S1");
    }

    #[tokio::test]
    async fn test_publish_requires_confirmation() {
        let h = Harness::new().await;
        h.add_draft("S1").await;
        let decisions = ScriptedDecisions::new().answer(DecisionKey::ConfirmPaidPost, false);

        let result = h.deployment(decisions).publish_drafts("reach").await;
        assert!(matches!(result, Err(DeployError::Declined(_))));
        assert!(!h
            .mock
            .calls()
            .await
            .iter()
            .any(|c| matches!(c, ProviderCall::Transition { .. })));
    }

    #[tokio::test]
    async fn test_publish_selected_drafts() {
        let h = Harness::new().await;
        h.add_draft("S1").await;
        h.add_draft("S2").await;
        h.add_draft("S3").await;
        let decisions = ScriptedDecisions::new()
            .choose_many(DecisionKey::SelectStudy, &["S1", "S3"])
            .answer(DecisionKey::ConfirmPaidPost, true);

        let acks = h.deployment(decisions).publish_drafts("reach").await.unwrap();

        let ids: Vec<_> = acks.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S3"]);
        assert!(acks.iter().all(|a| a.action == TransitionAction::Publish));
    }

    #[tokio::test]
    async fn test_publish_rejects_study_that_was_not_offered() {
        let h = Harness::new().await;
        h.add_draft("S1").await;
        h.add_draft("S2").await;
        let decisions = ScriptedDecisions::new()
            .choose_many(DecisionKey::SelectStudy, &["S1", "ACTIVE9"])
            .answer(DecisionKey::ConfirmPaidPost, true);

        let result = h.deployment(decisions).publish_drafts("reach").await;

        assert!(matches!(
            result,
            Err(DeployError::Decision(DecisionError::InvalidAnswer { ref answer, .. }))
                if answer == "ACTIVE9"
        ));
        assert!(!h
            .mock
            .calls()
            .await
            .iter()
            .any(|c| matches!(c, ProviderCall::Transition { .. })));
    }

    #[tokio::test]
    async fn test_publish_without_drafts() {
        let h = Harness::new().await;
        let result = h
            .deployment(ScriptedDecisions::new())
            .publish_drafts("reach")
            .await;
        assert!(matches!(result, Err(DeployError::NothingToPublish { .. })));
    }

    #[tokio::test]
    async fn test_publish_single_study() {
        let h = Harness::new().await;
        h.add_draft("S1").await;
        let decisions = ScriptedDecisions::new().answer(DecisionKey::ConfirmPaidPost, true);

        let ack = h.deployment(decisions).publish("S1").await.unwrap();
        assert_eq!(ack.status.as_deref(), Some("ACTIVE"));
    }
}
