//! Run options read from the environment.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};

use fieldwork_core::Marketplace;

/// What a run does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// MTurk: post HITs. Prolific: create or update a draft study.
    Deploy,
    /// Prolific: publish drafts.
    Publish,
    /// List the experiment's deployments.
    List,
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "deploy" | "draft" => Ok(Action::Deploy),
            "publish" | "post" => Ok(Action::Publish),
            "list" => Ok(Action::List),
            other => Err(anyhow!(
                "unknown action '{}' (expected deploy, publish or list)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config_path: PathBuf,
    pub experiment: String,
    pub marketplace: Marketplace,
    pub action: Action,
    pub sandbox: bool,
    pub compensation: bool,
}

impl RunOptions {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config_path = lookup("FIELDWORK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("fieldwork.toml"));

        let compensation = flag(&lookup, "FIELDWORK_COMPENSATION")?;
        let experiment = match lookup("FIELDWORK_EXPERIMENT") {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ if compensation => fieldwork_core::config::COMPENSATION_EXPERIMENT.to_string(),
            _ => bail!("FIELDWORK_EXPERIMENT must name the experiment to deploy"),
        };

        let marketplace = lookup("FIELDWORK_MARKETPLACE")
            .context("FIELDWORK_MARKETPLACE must be 'prolific' or 'mturk'")?
            .parse::<Marketplace>()
            .map_err(|e| anyhow!(e))?;

        let action = match lookup("FIELDWORK_ACTION") {
            Some(action) => action.parse()?,
            None => Action::Deploy,
        };

        Ok(Self {
            config_path,
            experiment,
            marketplace,
            action,
            sandbox: flag(&lookup, "FIELDWORK_SANDBOX")?,
            compensation,
        })
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<bool> {
    match lookup(name).as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("") | Some("0") | Some("false") | Some("no") => Ok(false),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some(other) => bail!("{} must be true or false, got '{}'", name, other),
    }
}
