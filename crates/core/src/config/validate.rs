use tracing::info;

use super::{types::Settings, ConfigError, StudyConfig, COMPENSATION_EXPERIMENT};

/// Validate tool settings.
/// Currently validates:
/// - API endpoints and the MTurk signing region are not empty
/// - Timeouts are not 0
pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    if settings.prolific.api_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "prolific.api_url cannot be empty".to_string(),
        ));
    }
    if settings.mturk.endpoint.trim().is_empty() || settings.mturk.sandbox_endpoint.trim().is_empty()
    {
        return Err(ConfigError::ValidationError(
            "mturk endpoints cannot be empty".to_string(),
        ));
    }
    if settings.mturk.region.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "mturk.region cannot be empty".to_string(),
        ));
    }
    if settings.prolific.timeout_secs == 0 || settings.mturk.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "timeout_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate a freshly loaded study config and apply experiment-level defaults.
pub fn normalize_study_config(
    experiment: &str,
    mut config: StudyConfig,
) -> Result<StudyConfig, ConfigError> {
    if config.title.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "title cannot be empty".to_string(),
        ));
    }

    if experiment == COMPENSATION_EXPERIMENT && !config.compensation {
        info!("Experiment '{}' always deploys in compensation mode", experiment);
        config.compensation = true;
    }

    config.workers_to_compensate = config
        .workers_to_compensate
        .into_iter()
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty())
        .collect();

    if config.compensation && config.workers_to_compensate.is_empty() {
        return Err(ConfigError::ValidationError(
            "workers_to_compensate must list at least one worker for a compensation run"
                .to_string(),
        ));
    }

    if let Some([min, max]) = config.screeners.age_range {
        if min > max {
            return Err(ConfigError::ValidationError(format!(
                "screeners.age_range is inverted: [{}, {}]",
                min, max
            )));
        }
    }
    if let Some([min, max]) = config.screeners.approval_rate_range {
        if min > max || max > 100 {
            return Err(ConfigError::ValidationError(format!(
                "screeners.approval_rate_range must be within [0, 100]: [{}, {}]",
                min, max
            )));
        }
    }

    if let Some(mturk) = &config.mturk {
        match mturk.reward.trim().parse::<f64>() {
            Ok(amount) if amount.is_finite() && amount >= 0.0 => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "mturk.reward must be a decimal amount, got '{}'",
                    mturk.reward
                )))
            }
        }

        let durations = [
            ("allotted_time", &mturk.allotted_time),
            ("expiration", &mturk.expiration),
            ("auto_approve", &mturk.auto_approve),
        ];
        for (name, duration) in durations {
            if duration.as_seconds().is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "mturk.{} is too long: {:?}",
                    name, duration
                )));
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn study(toml: &str) -> StudyConfig {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_validate_default_settings() {
        assert!(validate_settings(&Settings::default()).is_ok());
    }

    #[test]
    fn test_validate_empty_region_fails() {
        let mut settings = Settings::default();
        settings.mturk.region = " ".to_string();
        assert!(matches!(
            validate_settings(&settings),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let mut settings = Settings::default();
        settings.mturk.timeout_secs = 0;
        assert!(matches!(
            validate_settings(&settings),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_normalize_empty_title_fails() {
        let result = normalize_study_config("exp", study(r#"title = "  ""#));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_normalize_compensation_requires_workers() {
        let result = normalize_study_config(
            "exp",
            study(
                r#"
title = "Comp"
compensation = true
workers_to_compensate = ["  "]
"#,
            ),
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_normalize_compensation_experiment_name_forces_mode() {
        let config = normalize_study_config(
            COMPENSATION_EXPERIMENT,
            study(
                r#"
title = "Comp"
workers_to_compensate = ["A1 "]
"#,
            ),
        )
        .unwrap();
        assert!(config.compensation);
        assert_eq!(config.workers_to_compensate, vec!["A1".to_string()]);
    }

    #[test]
    fn test_normalize_rejects_inverted_age_range() {
        let result = normalize_study_config(
            "exp",
            study(
                r#"
title = "T"
[screeners]
age_range = [40, 18]
"#,
            ),
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_normalize_rejects_bad_reward() {
        let result = normalize_study_config(
            "exp",
            study(
                r#"
title = "T"
[mturk]
reward = "lots"
"#,
            ),
        );
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_normalize_rejects_non_finite_reward() {
        for reward in ["NaN", "inf", "-1.00"] {
            let result = normalize_study_config(
                "exp",
                study(&format!("title = \"T\"\n[mturk]\nreward = \"{}\"\n", reward)),
            );
            assert!(
                matches!(result, Err(ConfigError::ValidationError(_))),
                "reward {reward} accepted"
            );
        }
    }

    #[test]
    fn test_normalize_rejects_overflowing_duration() {
        let result = normalize_study_config(
            "exp",
            study(
                r#"
title = "T"
[mturk]
reward = "1.00"
expiration = { days = 9223372036854775807 }
"#,
            ),
        );
        match result {
            Err(ConfigError::ValidationError(msg)) => assert!(msg.contains("mturk.expiration")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
