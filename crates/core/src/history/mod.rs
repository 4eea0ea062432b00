//! Local per-experiment deployment journal.
//!
//! Each experiment directory holds a `study-history.json` mapping keys to
//! append-only sequences of identifiers returned by past deployments.
//!
//! The file is rewritten wholesale on every append with no locking. Two
//! processes appending to the same experiment at once can lose an update;
//! callers must keep to one writer per experiment.

mod store;

pub use store::{HistoryStore, HISTORY_FILE};

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors reading or writing the journal.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("No deployment history for '{experiment}': it has never been deployed")]
    NeverDeployed { experiment: String },

    #[error("Failed to read {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Journal at {path} is not a JSON object: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// Journal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HistoryKey {
    /// MTurk HIT ids.
    HitId,
    /// Hosting project ids.
    ProjectId,
    /// Hosting site ids.
    SiteId,
    /// Any other key, created on first use.
    Other(String),
}

impl HistoryKey {
    /// Keys every new journal starts with.
    pub const KNOWN: [HistoryKey; 3] = [HistoryKey::HitId, HistoryKey::ProjectId, HistoryKey::SiteId];

    pub fn as_str(&self) -> &str {
        match self {
            HistoryKey::HitId => "HITId",
            HistoryKey::ProjectId => "projectId",
            HistoryKey::SiteId => "siteId",
            HistoryKey::Other(name) => name,
        }
    }

    /// Key under which Prolific study ids are recorded.
    pub fn study_id() -> Self {
        HistoryKey::Other("studyId".to_string())
    }
}

impl fmt::Display for HistoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for HistoryKey {
    fn from(s: &str) -> Self {
        match s {
            "HITId" => HistoryKey::HitId,
            "projectId" => HistoryKey::ProjectId,
            "siteId" => HistoryKey::SiteId,
            other => HistoryKey::Other(other.to_string()),
        }
    }
}
