//! Types shared by deployment providers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported marketplaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marketplace {
    Prolific,
    Mturk,
}

impl Marketplace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Marketplace::Prolific => "prolific",
            Marketplace::Mturk => "mturk",
        }
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Marketplace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prolific" => Ok(Marketplace::Prolific),
            "mturk" => Ok(Marketplace::Mturk),
            other => Err(format!("unknown marketplace '{}'", other)),
        }
    }
}

/// Filter for listing deployments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Exact internal name (Prolific) or requester annotation (MTurk).
    pub name: Option<String>,
    /// Marketplace states to include; empty means all.
    pub states: Vec<String>,
}

impl ListFilter {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            states: Vec::new(),
        }
    }
}

/// A deployment as reported by a marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: String,
    /// Public title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Internal name or requester annotation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransitionAction {
    Publish,
    Pause,
    Start,
    Stop,
}

impl TransitionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionAction::Publish => "PUBLISH",
            TransitionAction::Pause => "PAUSE",
            TransitionAction::Start => "START",
            TransitionAction::Stop => "STOP",
        }
    }
}

/// Marketplace acknowledgement of a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub id: String,
    pub action: TransitionAction,
    /// Status reported after the transition, when the marketplace returns one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
