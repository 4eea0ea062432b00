//! Requirement shapes for each marketplace.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One eligibility predicate, in the shape of its target marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EligibilityRequirement {
    Prolific(ProlificRequirement),
    Mturk(MturkRequirement),
}

impl EligibilityRequirement {
    pub fn as_prolific(&self) -> Option<&ProlificRequirement> {
        match self {
            EligibilityRequirement::Prolific(r) => Some(r),
            EligibilityRequirement::Mturk(_) => None,
        }
    }

    pub fn as_mturk(&self) -> Option<&MturkRequirement> {
        match self {
            EligibilityRequirement::Mturk(r) => Some(r),
            EligibilityRequirement::Prolific(_) => None,
        }
    }
}

/// Prolific eligibility requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProlificRequirement {
    /// Rule class tag.
    #[serde(rename = "_cls")]
    pub rule_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<RequirementQuery>,
    pub attributes: Vec<RequirementAttribute>,
}

/// Screener question a Prolific requirement refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementQuery {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_help_text: Option<String>,
}

impl RequirementQuery {
    pub fn new(id: &str, question: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            question: question.map(str::to_string),
            participant_help_text: None,
        }
    }
}

/// Attribute value of a Prolific requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementAttribute {
    pub name: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

/// MTurk qualification requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MturkRequirement {
    pub qualification_type_id: String,
    pub comparator: Comparator,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub integer_values: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locale_values: Vec<Locale>,
    pub actions_guarded: ActionsGuarded,
}

impl MturkRequirement {
    /// Requirement hiding the task from holders of `qualification_id`.
    pub fn does_not_exist(qualification_id: &str) -> Self {
        Self::gate(qualification_id, Comparator::DoesNotExist)
    }

    /// Requirement showing the task only to holders of `qualification_id`.
    pub fn exists(qualification_id: &str) -> Self {
        Self::gate(qualification_id, Comparator::Exists)
    }

    fn gate(qualification_id: &str, comparator: Comparator) -> Self {
        Self {
            qualification_type_id: qualification_id.to_string(),
            comparator,
            integer_values: Vec::new(),
            locale_values: Vec::new(),
            actions_guarded: ActionsGuarded::DiscoverPreviewAndAccept,
        }
    }
}

/// MTurk requirement comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    Exists,
    DoesNotExist,
    In,
    GreaterThan,
    GreaterThanOrEqualTo,
}

/// What a failing worker is prevented from doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionsGuarded {
    Accept,
    PreviewAndAccept,
    DiscoverPreviewAndAccept,
}

/// MTurk locale value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Locale {
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdivision: Option<String>,
}
