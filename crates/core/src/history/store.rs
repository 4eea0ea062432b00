//! JSON-file backed journal.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::fs;
use tracing::{debug, info, warn};

use super::{HistoryError, HistoryKey};

/// Journal file name inside each experiment directory.
pub const HISTORY_FILE: &str = "study-history.json";

/// Append-only journal of deployment identifiers.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    experiments_dir: PathBuf,
}

impl HistoryStore {
    pub fn new(experiments_dir: impl Into<PathBuf>) -> Self {
        Self {
            experiments_dir: experiments_dir.into(),
        }
    }

    /// Path of an experiment's journal.
    pub fn path(&self, experiment: &str) -> PathBuf {
        self.experiments_dir.join(experiment).join(HISTORY_FILE)
    }

    /// Read the whole journal, or `None` if the experiment was never deployed.
    pub async fn read(&self, experiment: &str) -> Result<Option<Map<String, Value>>, HistoryError> {
        let path = self.path(experiment);
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No study history at {} yet", path.display());
                return Ok(None);
            }
            Err(e) => return Err(HistoryError::ReadFailed { path, source: e }),
        };

        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(other) => Err(HistoryError::Corrupt {
                path,
                reason: format!("found {}", json_kind(&other)),
            }),
            Err(e) => Err(HistoryError::Corrupt {
                path,
                reason: e.to_string(),
            }),
        }
    }

    /// Append `value` to the sequence under `key`, then rewrite the journal.
    pub async fn append(
        &self,
        experiment: &str,
        key: &HistoryKey,
        value: &str,
    ) -> Result<(), HistoryError> {
        let mut journal = match self.read(experiment).await? {
            Some(journal) => journal,
            None => {
                info!("Initializing new study history for '{}'", experiment);
                HistoryKey::KNOWN
                    .iter()
                    .map(|k| (k.as_str().to_string(), Value::Array(Vec::new())))
                    .collect()
            }
        };

        let entry = journal
            .entry(key.as_str().to_string())
            .or_insert(Value::Null);
        if !entry.is_array() {
            warn!(
                "Field '{}' does not exist in {}, creating it",
                key, HISTORY_FILE
            );
            *entry = Value::Array(Vec::new());
        }
        if let Value::Array(values) = entry {
            values.push(Value::String(value.to_string()));
        }

        self.write(experiment, &journal).await?;
        info!("Study history updated, most recent {} is '{}'", key, value);
        Ok(())
    }

    /// Last value recorded under `key`.
    ///
    /// Fails when the experiment has no journal at all; returns `None` when the
    /// journal exists but the key has no values yet.
    pub async fn latest(
        &self,
        experiment: &str,
        key: &HistoryKey,
    ) -> Result<Option<String>, HistoryError> {
        let journal = self
            .read(experiment)
            .await?
            .ok_or_else(|| HistoryError::NeverDeployed {
                experiment: experiment.to_string(),
            })?;

        Ok(journal
            .get(key.as_str())
            .and_then(Value::as_array)
            .and_then(|values| values.last())
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }))
    }

    /// URL of the most recently deployed hosting site.
    pub async fn latest_site_url(&self, experiment: &str) -> Result<Option<String>, HistoryError> {
        Ok(self
            .latest(experiment, &HistoryKey::SiteId)
            .await?
            .map(|site| format!("https://{}.web.app", site)))
    }

    /// Most recently used hosting project.
    pub async fn latest_project(&self, experiment: &str) -> Result<Option<String>, HistoryError> {
        self.latest(experiment, &HistoryKey::ProjectId).await
    }

    async fn write(
        &self,
        experiment: &str,
        journal: &Map<String, Value>,
    ) -> Result<(), HistoryError> {
        let path = self.path(experiment);
        if let Some(parent) = path.parent() {
            create_dir(parent, &path).await?;
        }

        let text = serde_json::to_string_pretty(journal).map_err(|e| HistoryError::Corrupt {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        fs::write(&path, text)
            .await
            .map_err(|e| HistoryError::WriteFailed { path, source: e })
    }
}

async fn create_dir(dir: &Path, file: &Path) -> Result<(), HistoryError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| HistoryError::WriteFailed {
            path: file.to_path_buf(),
            source: e,
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Captures the level of every event emitted while installed.
    #[derive(Clone, Default)]
    struct Levels(Arc<Mutex<Vec<Level>>>);

    impl<S: Subscriber> Layer<S> for Levels {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().unwrap().push(*event.metadata().level());
        }
    }

    fn store() -> (HistoryStore, TempDir) {
        let dir = TempDir::new().unwrap();
        (HistoryStore::new(dir.path()), dir)
    }

    async fn raw(store: &HistoryStore, experiment: &str) -> Value {
        let text = std::fs::read_to_string(store.path(experiment)).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn test_append_initializes_known_keys() {
        let (store, _dir) = store();
        store.append("exp", &HistoryKey::HitId, "H1").await.unwrap();

        assert_eq!(
            raw(&store, "exp").await,
            json!({ "HITId": ["H1"], "projectId": [], "siteId": [] })
        );
    }

    #[tokio::test]
    async fn test_latest_returns_last_appended() {
        let (store, _dir) = store();
        store.append("exp", &HistoryKey::SiteId, "A").await.unwrap();
        store.append("exp", &HistoryKey::SiteId, "B").await.unwrap();

        assert_eq!(
            store.latest("exp", &HistoryKey::SiteId).await.unwrap(),
            Some("B".to_string())
        );
        assert_eq!(
            raw(&store, "exp").await["siteId"],
            json!(["A", "B"])
        );
    }

    #[tokio::test]
    async fn test_first_deployment_logs_no_warning() {
        let levels = Levels::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(levels.clone()));
        let (store, _dir) = store();

        assert!(store.read("exp").await.unwrap().is_none());
        store.append("exp", &HistoryKey::HitId, "H1").await.unwrap();

        let recorded = levels.0.lock().unwrap().clone();
        assert!(recorded.contains(&Level::DEBUG));
        assert!(!recorded.contains(&Level::WARN));
    }

    #[tokio::test]
    async fn test_latest_without_journal_is_an_error() {
        let (store, _dir) = store();
        let result = store.latest("never", &HistoryKey::HitId).await;
        assert!(matches!(result, Err(HistoryError::NeverDeployed { .. })));
    }

    #[tokio::test]
    async fn test_latest_of_empty_key_is_none() {
        let (store, _dir) = store();
        store.append("exp", &HistoryKey::HitId, "H1").await.unwrap();
        assert_eq!(store.latest("exp", &HistoryKey::SiteId).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_append_creates_missing_field() {
        let (store, _dir) = store();
        std::fs::create_dir_all(store.path("exp").parent().unwrap()).unwrap();
        std::fs::write(store.path("exp"), r#"{"HITId": ["H0"], "siteId": "broken"}"#).unwrap();

        store
            .append("exp", &HistoryKey::study_id(), "S1")
            .await
            .unwrap();
        store.append("exp", &HistoryKey::SiteId, "site-a").await.unwrap();

        let journal = raw(&store, "exp").await;
        assert_eq!(journal["HITId"], json!(["H0"]));
        assert_eq!(journal["studyId"], json!(["S1"]));
        assert_eq!(journal["siteId"], json!(["site-a"]));
    }

    #[tokio::test]
    async fn test_corrupt_journal() {
        let (store, _dir) = store();
        std::fs::create_dir_all(store.path("exp").parent().unwrap()).unwrap();
        std::fs::write(store.path("exp"), "[1, 2]").unwrap();

        let result = store.append("exp", &HistoryKey::HitId, "H1").await;
        assert!(matches!(result, Err(HistoryError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn test_latest_site_url() {
        let (store, _dir) = store();
        store
            .append("exp", &HistoryKey::SiteId, "reach-lab")
            .await
            .unwrap();
        store
            .append("exp", &HistoryKey::ProjectId, "lab-project")
            .await
            .unwrap();

        assert_eq!(
            store.latest_site_url("exp").await.unwrap(),
            Some("https://reach-lab.web.app".to_string())
        );
        assert_eq!(
            store.latest_project("exp").await.unwrap(),
            Some("lab-project".to_string())
        );
    }

    #[test]
    fn test_history_key_round_trip_names() {
        for key in HistoryKey::KNOWN.iter() {
            assert_eq!(&HistoryKey::from(key.as_str()), key);
        }
        assert_eq!(HistoryKey::study_id().as_str(), "studyId");
    }
}
