mod credentials;
mod loader;
mod study;
mod types;
mod validate;

pub use credentials::{CredentialSource, EnvCredentials, StaticCredentials};
pub use loader::{load_settings, load_settings_from_str, load_study_config, study_config_path};
pub use study::*;
pub use types::*;
pub use validate::{normalize_study_config, validate_settings};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),
}
