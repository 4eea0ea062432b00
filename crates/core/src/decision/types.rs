use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a question independently of its wording.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKey {
    /// Posting will cost money.
    ConfirmPaidPost,
    /// Also require 100+ approved tasks alongside an approval-rate cutoff.
    ExcludeUnder100Approved,
    /// Drop requirements so the sandbox task can be previewed.
    DisableSandboxRequirements,
    /// Split into fee-free batches.
    AvoidExtraFee,
    /// Patch an existing draft instead of creating a new one.
    UpdateExistingStudy,
    SelectStudy,
    SelectWorkspace,
    SelectProject,
}

impl DecisionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKey::ConfirmPaidPost => "confirm_paid_post",
            DecisionKey::ExcludeUnder100Approved => "exclude_under_100_approved",
            DecisionKey::DisableSandboxRequirements => "disable_sandbox_requirements",
            DecisionKey::AvoidExtraFee => "avoid_extra_fee",
            DecisionKey::UpdateExistingStudy => "update_existing_study",
            DecisionKey::SelectStudy => "select_study",
            DecisionKey::SelectWorkspace => "select_workspace",
            DecisionKey::SelectProject => "select_project",
        }
    }
}

impl fmt::Display for DecisionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A yes/no question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub key: DecisionKey,
    pub message: String,
    /// Answer suggested to the user.
    pub default: bool,
}

impl Confirmation {
    pub fn new(key: DecisionKey, message: impl Into<String>, default: bool) -> Self {
        Self {
            key,
            message: message.into(),
            default,
        }
    }
}

/// One selectable option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    /// Shown to the user.
    pub label: String,
    /// Returned to the caller.
    pub value: String,
}

impl ChoiceOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A single- or multi-choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub key: DecisionKey,
    pub message: String,
    pub options: Vec<ChoiceOption>,
}

impl Choice {
    pub fn new(key: DecisionKey, message: impl Into<String>, options: Vec<ChoiceOption>) -> Self {
        Self {
            key,
            message: message.into(),
            options,
        }
    }
}
