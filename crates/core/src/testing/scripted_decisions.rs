//! Decision provider answering from a script.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::decision::{Choice, Confirmation, DecisionError, DecisionKey, DecisionProvider};

/// Answers questions from a fixed script and records what was asked.
///
/// Unscripted confirmations fail with [`DecisionError::Unanswered`] unless
/// the script was built with [`ScriptedDecisions::accept_defaults`].
///
/// # Example
///
/// ```rust,ignore
/// let decisions = ScriptedDecisions::new()
///     .answer(DecisionKey::ConfirmPaidPost, true)
///     .choose(DecisionKey::SelectProject, "P1");
///
/// // ... run a workflow ...
///
/// assert_eq!(decisions.asked().await, vec![DecisionKey::ConfirmPaidPost]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedDecisions {
    confirmations: HashMap<DecisionKey, bool>,
    selections: HashMap<DecisionKey, Vec<String>>,
    use_defaults: bool,
    asked: Arc<RwLock<Vec<DecisionKey>>>,
}

impl ScriptedDecisions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer unscripted confirmations with their suggested default.
    pub fn accept_defaults() -> Self {
        Self {
            use_defaults: true,
            ..Self::default()
        }
    }

    /// Script a yes/no answer.
    pub fn answer(mut self, key: DecisionKey, yes: bool) -> Self {
        self.confirmations.insert(key, yes);
        self
    }

    /// Script a single choice.
    pub fn choose(mut self, key: DecisionKey, value: impl Into<String>) -> Self {
        self.selections.insert(key, vec![value.into()]);
        self
    }

    /// Script a multi-choice answer.
    pub fn choose_many(mut self, key: DecisionKey, values: &[&str]) -> Self {
        self.selections
            .insert(key, values.iter().map(|v| v.to_string()).collect());
        self
    }

    /// Every question asked so far, in order.
    pub async fn asked(&self) -> Vec<DecisionKey> {
        self.asked.read().await.clone()
    }

    async fn record(&self, key: &DecisionKey) {
        self.asked.write().await.push(key.clone());
    }
}

#[async_trait]
impl DecisionProvider for ScriptedDecisions {
    async fn confirm(&self, confirmation: &Confirmation) -> Result<bool, DecisionError> {
        self.record(&confirmation.key).await;
        match self.confirmations.get(&confirmation.key) {
            Some(answer) => Ok(*answer),
            None if self.use_defaults => Ok(confirmation.default),
            None => Err(DecisionError::Unanswered(confirmation.key.clone())),
        }
    }

    async fn select(&self, choice: &Choice) -> Result<String, DecisionError> {
        self.record(&choice.key).await;
        self.selections
            .get(&choice.key)
            .and_then(|values| values.first().cloned())
            .ok_or_else(|| DecisionError::Unanswered(choice.key.clone()))
    }

    async fn multi_select(&self, choice: &Choice) -> Result<Vec<String>, DecisionError> {
        self.record(&choice.key).await;
        self.selections
            .get(&choice.key)
            .cloned()
            .ok_or_else(|| DecisionError::Unanswered(choice.key.clone()))
    }
}
