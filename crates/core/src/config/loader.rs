use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

use super::{types::Settings, validate::normalize_study_config, ConfigError, StudyConfig};

/// File name of the per-experiment study config.
pub const STUDY_CONFIG_FILE: &str = "study-config.toml";

/// Load tool settings from file with environment variable overrides.
///
/// A missing file is not an error: settings have usable defaults.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let mut figment = Figment::new();
    if path.exists() {
        figment = figment.merge(Toml::file(path));
    }

    figment
        .merge(Env::prefixed("FIELDWORK_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load settings from TOML string (useful for testing)
pub fn load_settings_from_str(toml_str: &str) -> Result<Settings, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Path of an experiment's study config.
pub fn study_config_path(experiments_dir: &Path, experiment: &str) -> PathBuf {
    experiments_dir.join(experiment).join(STUDY_CONFIG_FILE)
}

/// Load and normalize the study config of `experiment`.
pub fn load_study_config(
    experiments_dir: &Path,
    experiment: &str,
) -> Result<StudyConfig, ConfigError> {
    let path = study_config_path(experiments_dir, experiment);
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let raw: StudyConfig = Figment::new()
        .merge(Toml::file(&path))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    normalize_study_config(experiment, raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_settings_from_str_valid() {
        let toml = r#"
experiments_dir = "/srv/studies"

[mturk]
timeout_secs = 10
"#;
        let settings = load_settings_from_str(toml).unwrap();
        assert_eq!(settings.experiments_dir, PathBuf::from("/srv/studies"));
        assert_eq!(settings.mturk.timeout_secs, 10);
    }

    #[test]
    fn test_load_settings_from_str_invalid() {
        let result = load_settings_from_str("experiments_dir = [1, 2]");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_settings_missing_file_uses_defaults() {
        let settings = load_settings(Path::new("/nonexistent/fieldwork.toml")).unwrap();
        assert_eq!(settings.experiments_dir, PathBuf::from("experiments"));
    }

    #[test]
    fn test_load_study_config_not_found() {
        let dir = TempDir::new().unwrap();
        let result = load_study_config(dir.path(), "missing");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_study_config_from_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("reach")).unwrap();
        fs::write(
            study_config_path(dir.path(), "reach"),
            r#"
title = "Reaching study"
total_available_places = 23

[description]
summary_para = ["Move the cursor to the targets."]

[screeners]
age_range = [18, 40]

[mturk]
reward = "2.00"
keywords = "reaching, motor"
"#,
        )
        .unwrap();

        let config = load_study_config(dir.path(), "reach").unwrap();
        assert_eq!(config.title, "Reaching study");
        assert_eq!(config.total_available_places, 23);
        assert_eq!(config.screeners.age_range, Some([18, 40]));
        assert_eq!(config.mturk.unwrap().reward, "2.00");
    }
}
