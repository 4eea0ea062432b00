//! Decisions an MTurk deployment needs, gathered before anything is created.

use tracing::debug;

use crate::batch::fee_applies;
use crate::config::StudyConfig;
use crate::decision::{Confirmation, DecisionKey, DecisionProvider};
use crate::eligibility::{EligibilityChoices, EligibilityRuleBuilder};
use crate::provider::Marketplace;

use super::DeployError;

/// Which questions an MTurk deployment must ask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MturkDecisionPlan {
    /// Posting to production costs money.
    pub confirm_cost: bool,
    /// Approval cutoff that triggers the under-100 question.
    pub under_100_cutoff: Option<u32>,
    pub sandbox_disable: bool,
    /// Participant count that triggers the fee question.
    pub fee_places: Option<u32>,
}

/// Answers to an [`MturkDecisionPlan`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MturkDecisions {
    pub eligibility: EligibilityChoices,
    pub avoid_fee: bool,
}

impl MturkDecisionPlan {
    pub fn for_study(study: &StudyConfig, sandbox: bool) -> Self {
        let builder = EligibilityRuleBuilder::new(Marketplace::Mturk).with_sandbox(sandbox);

        let under_100_cutoff = if study.compensation {
            None
        } else {
            study
                .screeners
                .approval_cutoff()
                .filter(|_| builder.asks_under_100_exclusion(&study.screeners))
        };

        // Every deployment carries a gate qualification, so a sandbox run
        // always has something to disable.
        let sandbox_disable = if study.compensation {
            sandbox
        } else {
            builder.asks_sandbox_disable(&study.screeners, true)
        };

        let places = study.places();
        Self {
            confirm_cost: !sandbox,
            under_100_cutoff,
            sandbox_disable,
            fee_places: fee_applies(places).then_some(places),
        }
    }

    /// The questions in the order they are asked.
    pub fn confirmations(&self) -> Vec<Confirmation> {
        let mut questions = Vec::new();

        if self.confirm_cost {
            questions.push(Confirmation::new(
                DecisionKey::ConfirmPaidPost,
                "You are about to post a real study on MTurk, which will cost money! Are you sure you want to do this?",
                false,
            ));
        }
        if let Some(cutoff) = self.under_100_cutoff {
            questions.push(Confirmation::new(
                DecisionKey::ExcludeUnder100Approved,
                format!(
                    "Approval rate must be at least {}%. Workers with fewer than 100 approved tasks show a 100% approval rate. Block these workers too?",
                    cutoff
                ),
                true,
            ));
        }
        if self.sandbox_disable {
            questions.push(Confirmation::new(
                DecisionKey::DisableSandboxRequirements,
                "Your study has requirements that may block you from viewing it in the MTurk Sandbox. Disable these requirements for this draft study?",
                true,
            ));
        }
        if let Some(places) = self.fee_places {
            questions.push(Confirmation::new(
                DecisionKey::AvoidExtraFee,
                format!(
                    "You are trying to recruit {} participants from MTurk. Would you like to avoid the extra 20% fee by posting multiple copies with 9 or fewer participants in each?",
                    places
                ),
                true,
            ));
        }

        questions
    }

    /// Ask every question; declining the cost confirmation ends the run.
    pub async fn resolve(
        &self,
        decisions: &dyn DecisionProvider,
    ) -> Result<MturkDecisions, DeployError> {
        let mut answers = MturkDecisions::default();

        for question in self.confirmations() {
            let yes = decisions.confirm(&question).await?;
            debug!("Decision {} = {}", question.key, yes);

            match question.key {
                DecisionKey::ConfirmPaidPost if !yes => {
                    return Err(DeployError::Declined(
                        "Your study has NOT been posted to MTurk".to_string(),
                    ));
                }
                DecisionKey::ExcludeUnder100Approved => {
                    answers.eligibility.exclude_under_100_approved = yes
                }
                DecisionKey::DisableSandboxRequirements => {
                    answers.eligibility.disable_in_sandbox = yes
                }
                DecisionKey::AvoidExtraFee => answers.avoid_fee = yes,
                _ => {}
            }
        }

        Ok(answers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, ScriptedDecisions};

    #[test]
    fn test_production_plan_with_cutoff_and_fee() {
        let mut study = fixtures::study(23);
        study.screeners = fixtures::age_and_cutoff();

        let plan = MturkDecisionPlan::for_study(&study, false);
        let keys: Vec<_> = plan.confirmations().into_iter().map(|c| c.key).collect();
        assert_eq!(
            keys,
            vec![
                DecisionKey::ConfirmPaidPost,
                DecisionKey::ExcludeUnder100Approved,
                DecisionKey::AvoidExtraFee,
            ]
        );
    }

    #[test]
    fn test_sandbox_plan_skips_cost() {
        let plan = MturkDecisionPlan::for_study(&fixtures::study(5), true);
        let keys: Vec<_> = plan.confirmations().into_iter().map(|c| c.key).collect();
        assert_eq!(keys, vec![DecisionKey::DisableSandboxRequirements]);
    }

    #[test]
    fn test_compensation_plan_uses_worker_count() {
        let study = fixtures::compensation(&["W1", "W2"]);
        let plan = MturkDecisionPlan::for_study(&study, false);
        assert_eq!(plan.under_100_cutoff, None);
        assert_eq!(plan.fee_places, None);
        assert!(plan.confirm_cost);
    }

    #[tokio::test]
    async fn test_declining_cost_stops() {
        let plan = MturkDecisionPlan::for_study(&fixtures::study(5), false);
        let decisions = ScriptedDecisions::new().answer(DecisionKey::ConfirmPaidPost, false);

        let result = plan.resolve(&decisions).await;
        assert!(matches!(result, Err(DeployError::Declined(_))));
    }

    #[tokio::test]
    async fn test_resolve_collects_answers() {
        let mut study = fixtures::study(23);
        study.screeners = fixtures::age_and_cutoff();
        let plan = MturkDecisionPlan::for_study(&study, false);

        let decisions = ScriptedDecisions::new()
            .answer(DecisionKey::ConfirmPaidPost, true)
            .answer(DecisionKey::ExcludeUnder100Approved, true)
            .answer(DecisionKey::AvoidExtraFee, false);

        let answers = plan.resolve(&decisions).await.unwrap();
        assert!(answers.eligibility.exclude_under_100_approved);
        assert!(!answers.eligibility.disable_in_sandbox);
        assert!(!answers.avoid_fee);
    }

    #[tokio::test]
    async fn test_unscripted_question_is_an_error() {
        let plan = MturkDecisionPlan::for_study(&fixtures::study(5), false);
        let result = plan.resolve(&ScriptedDecisions::new()).await;
        assert!(matches!(result, Err(DeployError::Decision(_))));
    }
}
