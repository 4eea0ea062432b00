//! Terminal prompts.

use async_trait::async_trait;
use dialoguer::{theme::ColorfulTheme, Confirm, MultiSelect, Select};
use tokio::task;

use fieldwork_core::decision::{Choice, Confirmation, DecisionError, DecisionProvider};

/// Asks every question on the terminal.
///
/// dialoguer blocks on stdin, so each prompt runs on the blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalDecisions;

#[async_trait]
impl DecisionProvider for TerminalDecisions {
    async fn confirm(&self, confirmation: &Confirmation) -> Result<bool, DecisionError> {
        let message = confirmation.message.clone();
        let default = confirmation.default;

        blocking(move || {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(message)
                .default(default)
                .interact()
        })
        .await
    }

    async fn select(&self, choice: &Choice) -> Result<String, DecisionError> {
        let message = choice.message.clone();
        let labels = labels(choice);

        let index = blocking(move || {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt(message)
                .items(&labels)
                .default(0)
                .interact()
        })
        .await?;

        choice
            .options
            .get(index)
            .map(|o| o.value.clone())
            .ok_or_else(|| DecisionError::NoOptions(choice.key.clone()))
    }

    async fn multi_select(&self, choice: &Choice) -> Result<Vec<String>, DecisionError> {
        let message = choice.message.clone();
        let labels = labels(choice);

        let indices = blocking(move || {
            MultiSelect::with_theme(&ColorfulTheme::default())
                .with_prompt(message)
                .items(&labels)
                .interact()
        })
        .await?;

        Ok(indices
            .into_iter()
            .filter_map(|i| choice.options.get(i).map(|o| o.value.clone()))
            .collect())
    }
}

fn labels(choice: &Choice) -> Vec<String> {
    choice.options.iter().map(|o| o.label.clone()).collect()
}

async fn blocking<T, F>(prompt: F) -> Result<T, DecisionError>
where
    T: Send + 'static,
    F: FnOnce() -> dialoguer::Result<T> + Send + 'static,
{
    task::spawn_blocking(prompt)
        .await
        .map_err(|e| DecisionError::PromptFailed(e.to_string()))?
        .map_err(|e| DecisionError::PromptFailed(e.to_string()))
}
