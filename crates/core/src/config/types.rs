use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{ConfigError, CredentialSource};

/// Tool settings, shared by every experiment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Directory holding one sub-directory per experiment.
    #[serde(default = "default_experiments_dir")]
    pub experiments_dir: PathBuf,
    #[serde(default)]
    pub prolific: ProlificSettings,
    #[serde(default)]
    pub mturk: MturkSettings,
    #[serde(default)]
    pub datastore: DatastoreSettings,
    #[serde(default)]
    pub layouts: LayoutSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            experiments_dir: default_experiments_dir(),
            prolific: ProlificSettings::default(),
            mturk: MturkSettings::default(),
            datastore: DatastoreSettings::default(),
            layouts: LayoutSettings::default(),
        }
    }
}

fn default_experiments_dir() -> PathBuf {
    PathBuf::from("experiments")
}

/// Prolific API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProlificSettings {
    /// API base URL (default: https://api.prolific.co/api/v1)
    #[serde(default = "default_prolific_url")]
    pub api_url: String,
    /// Name of the credential holding the API token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for ProlificSettings {
    fn default() -> Self {
        Self {
            api_url: default_prolific_url(),
            token_env: default_token_env(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ProlificSettings {
    /// Resolve the API token through the given credential source.
    pub fn token(&self, credentials: &dyn CredentialSource) -> Result<String, ConfigError> {
        credentials
            .secret(&self.token_env)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ConfigError::MissingCredential(self.token_env.clone()))
    }
}

fn default_prolific_url() -> String {
    "https://api.prolific.co/api/v1".to_string()
}

fn default_token_env() -> String {
    "PROLIFIC_AUTH_TOKEN".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// MTurk requester endpoints.
///
/// Credentials are not part of the settings: they come from the standard AWS
/// chain (`AWS_ACCESS_KEY_ID`, `AWS_PROFILE`, ...).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MturkSettings {
    /// Signing region of the requester API.
    #[serde(default = "default_mturk_region")]
    pub region: String,
    #[serde(default = "default_mturk_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_mturk_sandbox_endpoint")]
    pub sandbox_endpoint: String,
    #[serde(default = "default_preview_url")]
    pub preview_url: String,
    #[serde(default = "default_sandbox_preview_url")]
    pub sandbox_preview_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for MturkSettings {
    fn default() -> Self {
        Self {
            region: default_mturk_region(),
            endpoint: default_mturk_endpoint(),
            sandbox_endpoint: default_mturk_sandbox_endpoint(),
            preview_url: default_preview_url(),
            sandbox_preview_url: default_sandbox_preview_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl MturkSettings {
    pub fn endpoint_for(&self, sandbox: bool) -> &str {
        if sandbox {
            &self.sandbox_endpoint
        } else {
            &self.endpoint
        }
    }

    pub fn preview_url_for(&self, sandbox: bool) -> &str {
        if sandbox {
            &self.sandbox_preview_url
        } else {
            &self.preview_url
        }
    }
}

fn default_mturk_region() -> String {
    "us-east-1".to_string()
}

fn default_mturk_endpoint() -> String {
    "https://mturk-requester.us-east-1.amazonaws.com".to_string()
}

fn default_mturk_sandbox_endpoint() -> String {
    "https://mturk-requester-sandbox.us-east-1.amazonaws.com".to_string()
}

fn default_preview_url() -> String {
    "https://worker.mturk.com/mturk/preview?groupId=".to_string()
}

fn default_sandbox_preview_url() -> String {
    "https://workersandbox.mturk.com/mturk/preview?groupId=".to_string()
}

/// Backing datastore the task page writes to.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatastoreSettings {
    #[serde(default)]
    pub database_url: String,
}

/// Where task-page layouts come from.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LayoutSettings {
    /// Directory containing `mturk-layout.html` and
    /// `mturk-layout-compensation.html`. Bundled layouts are used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Settings view safe to print (credential names only, never values).
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSettings {
    pub experiments_dir: PathBuf,
    pub prolific_api_url: String,
    pub prolific_token_configured: bool,
    pub mturk_endpoint: String,
    pub mturk_sandbox_endpoint: String,
    pub database_url_configured: bool,
}

impl SanitizedSettings {
    pub fn new(settings: &Settings, credentials: &dyn CredentialSource) -> Self {
        Self {
            experiments_dir: settings.experiments_dir.clone(),
            prolific_api_url: settings.prolific.api_url.clone(),
            prolific_token_configured: settings.prolific.token(credentials).is_ok(),
            mturk_endpoint: settings.mturk.endpoint.clone(),
            mturk_sandbox_endpoint: settings.mturk.sandbox_endpoint.clone(),
            database_url_configured: !settings.datastore.database_url.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticCredentials;

    #[test]
    fn test_deserialize_empty_settings_uses_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.experiments_dir, PathBuf::from("experiments"));
        assert_eq!(settings.prolific.api_url, "https://api.prolific.co/api/v1");
        assert_eq!(settings.prolific.token_env, "PROLIFIC_AUTH_TOKEN");
        assert_eq!(settings.mturk.timeout_secs, 30);
        assert_eq!(settings.mturk.region, "us-east-1");
        assert!(settings.layouts.dir.is_none());
    }

    #[test]
    fn test_mturk_endpoint_selection() {
        let mturk = MturkSettings::default();
        assert!(mturk.endpoint_for(true).contains("sandbox"));
        assert!(!mturk.endpoint_for(false).contains("sandbox"));
        assert!(mturk.preview_url_for(true).starts_with("https://workersandbox"));
    }

    #[test]
    fn test_prolific_token_resolution() {
        let prolific = ProlificSettings::default();
        let creds = StaticCredentials::new().with("PROLIFIC_AUTH_TOKEN", "abc");
        assert_eq!(prolific.token(&creds).unwrap(), "abc");

        let empty = StaticCredentials::new().with("PROLIFIC_AUTH_TOKEN", "");
        assert!(matches!(
            prolific.token(&empty),
            Err(ConfigError::MissingCredential(_))
        ));
    }

    #[test]
    fn test_sanitized_settings_hides_token() {
        let settings = Settings::default();
        let creds = StaticCredentials::new().with("PROLIFIC_AUTH_TOKEN", "secret");
        let sanitized = SanitizedSettings::new(&settings, &creds);
        assert!(sanitized.prolific_token_configured);
        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret"));
    }
}
