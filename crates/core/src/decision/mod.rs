//! Human decisions the deployment workflows depend on.
//!
//! Every question is keyed by a [`DecisionKey`] so a non-interactive
//! [`DecisionProvider`] can answer it deterministically. How a question is
//! rendered is entirely up to the provider.

mod types;

pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors resolving a decision.
#[derive(Debug, Error)]
pub enum DecisionError {
    /// The provider has no answer for this question.
    #[error("No answer available for '{0}'")]
    Unanswered(DecisionKey),

    /// The answer does not name one of the offered options.
    #[error("Answer '{answer}' is not an option for '{key}'")]
    InvalidAnswer { key: DecisionKey, answer: String },

    /// A choice was offered with nothing to choose from.
    #[error("Nothing to choose from for '{0}'")]
    NoOptions(DecisionKey),

    /// The prompt itself failed (terminal gone, I/O error).
    #[error("Prompt failed: {0}")]
    PromptFailed(String),
}

/// Resolves confirmations and choices.
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    /// Yes/no question.
    async fn confirm(&self, confirmation: &Confirmation) -> Result<bool, DecisionError>;

    /// Pick exactly one option; returns its value.
    async fn select(&self, choice: &Choice) -> Result<String, DecisionError>;

    /// Pick any number of options; returns their values in offered order.
    async fn multi_select(&self, choice: &Choice) -> Result<Vec<String>, DecisionError>;
}

/// Select without asking when there is a single option.
pub async fn select_or_only(
    decisions: &dyn DecisionProvider,
    choice: &Choice,
) -> Result<String, DecisionError> {
    match choice.options.as_slice() {
        [] => Err(DecisionError::NoOptions(choice.key.clone())),
        [only] => Ok(only.value.clone()),
        _ => {
            let answer = decisions.select(choice).await?;
            if choice.options.iter().any(|o| o.value == answer) {
                Ok(answer)
            } else {
                Err(DecisionError::InvalidAnswer {
                    key: choice.key.clone(),
                    answer,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedDecisions;

    fn choice(values: &[&str]) -> Choice {
        Choice::new(
            DecisionKey::SelectProject,
            "Please choose a project:",
            values.iter().map(|v| ChoiceOption::new(*v, *v)).collect(),
        )
    }

    #[tokio::test]
    async fn test_single_option_is_not_asked() {
        let decisions = ScriptedDecisions::new();
        let value = select_or_only(&decisions, &choice(&["P1"])).await.unwrap();
        assert_eq!(value, "P1");
        assert!(decisions.asked().await.is_empty());
    }

    #[tokio::test]
    async fn test_multiple_options_are_asked() {
        let decisions = ScriptedDecisions::new().choose(DecisionKey::SelectProject, "P2");
        let value = select_or_only(&decisions, &choice(&["P1", "P2"]))
            .await
            .unwrap();
        assert_eq!(value, "P2");
        assert_eq!(decisions.asked().await, vec![DecisionKey::SelectProject]);
    }

    #[tokio::test]
    async fn test_answer_outside_options_is_rejected() {
        let decisions = ScriptedDecisions::new().choose(DecisionKey::SelectProject, "P9");
        let result = select_or_only(&decisions, &choice(&["P1", "P2"])).await;
        assert!(matches!(result, Err(DecisionError::InvalidAnswer { .. })));
    }

    #[tokio::test]
    async fn test_empty_choice() {
        let decisions = ScriptedDecisions::new();
        let result = select_or_only(&decisions, &choice(&[])).await;
        assert!(matches!(result, Err(DecisionError::NoOptions(_))));
    }
}
