//! Per-experiment study configuration.

use serde::{Deserialize, Serialize};

/// Experiment name that always deploys in compensation mode.
pub const COMPENSATION_EXPERIMENT: &str = "compensation";

/// Platform-agnostic study configuration, loaded once per run.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StudyConfig {
    /// Public title shown on both marketplaces.
    pub title: String,
    #[serde(default)]
    pub description: DescriptionSections,
    /// Total participant slots requested.
    #[serde(default)]
    pub total_available_places: u32,
    /// Deploy a one-off compensation task for `workers_to_compensate`.
    #[serde(default)]
    pub compensation: bool,
    #[serde(default)]
    pub workers_to_compensate: Vec<String>,
    #[serde(default)]
    pub screeners: Screeners,
    #[serde(default)]
    pub prolific: Option<ProlificStudyConfig>,
    #[serde(default)]
    pub mturk: Option<MturkStudyConfig>,
}

impl StudyConfig {
    /// Number of slots a deployment should request.
    ///
    /// Compensation runs recruit exactly the listed workers.
    pub fn places(&self) -> u32 {
        if self.compensation {
            self.workers_to_compensate.len() as u32
        } else {
            self.total_available_places
        }
    }
}

/// Description fragments rendered into task pages and study descriptions.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DescriptionSections {
    #[serde(default)]
    pub requirements_list: Vec<String>,
    #[serde(default)]
    pub requirements_para: Vec<String>,
    #[serde(default)]
    pub summary_para: Vec<String>,
    #[serde(default)]
    pub instructions_list: Vec<String>,
    #[serde(default)]
    pub instructions_para: Vec<String>,
}

/// Abstract screening flags; each marketplace honours the subset it supports.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Screeners {
    /// Inclusive `[min, max]` participant age.
    #[serde(default)]
    pub age_range: Option<[u32; 2]>,
    /// Inclusive `[min, max]` approval rate in percent.
    #[serde(default)]
    pub approval_rate_range: Option<[u32; 2]>,
    #[serde(default)]
    pub fluent_english: bool,
    #[serde(default)]
    pub exclude_dementia: bool,
    #[serde(default)]
    pub exclude_ms: bool,
    #[serde(default)]
    pub exclude_mental_health_impact: bool,
    #[serde(default)]
    pub normal_vision: bool,
    #[serde(default)]
    pub own_vr: bool,
    /// Country code; only `US` is currently mapped.
    #[serde(default)]
    pub restrict_location: Option<String>,
    #[serde(default)]
    pub restrict_approval_rate: Option<ApprovalRateCutoff>,
    /// Qualification ids whose holders are excluded.
    #[serde(default)]
    pub qualification_blocklist: Vec<String>,
    /// Qualification ids whose holders are required.
    #[serde(default)]
    pub qualification_allowlist: Vec<String>,
}

/// Approval-rate cutoff as written in the config: a flag or a percentage.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ApprovalRateCutoff {
    Enabled(bool),
    Percent(f64),
}

/// Cutoff used when the configured value is not a whole-number percentage.
pub const DEFAULT_APPROVAL_CUTOFF: u32 = 99;

impl ApprovalRateCutoff {
    /// Effective cutoff percentage, or `None` when the filter is off.
    pub fn percent(&self) -> Option<u32> {
        match *self {
            ApprovalRateCutoff::Enabled(false) => None,
            ApprovalRateCutoff::Enabled(true) => Some(DEFAULT_APPROVAL_CUTOFF),
            ApprovalRateCutoff::Percent(p) if p == 0.0 => None,
            ApprovalRateCutoff::Percent(p) if p.fract() == 0.0 && (0.0..=100.0).contains(&p) => {
                Some(p as u32)
            }
            ApprovalRateCutoff::Percent(_) => Some(DEFAULT_APPROVAL_CUTOFF),
        }
    }
}

impl Screeners {
    pub fn approval_cutoff(&self) -> Option<u32> {
        self.restrict_approval_rate.and_then(|c| c.percent())
    }
}

/// Prolific-specific study settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProlificStudyConfig {
    /// Estimated completion time in minutes.
    pub estimated_completion_time: u32,
    /// Maximum allowed time in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_allowed_time: Option<u32>,
    /// Reward in cents.
    pub reward: u32,
    #[serde(default = "default_devices")]
    pub compatible_devices: Vec<String>,
    /// Naivety distribution rate (0.0 - 1.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naivety: Option<f64>,
    /// Project id; chosen interactively when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

fn default_devices() -> Vec<String> {
    vec!["desktop".to_string()]
}

/// MTurk-specific study settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MturkStudyConfig {
    /// Reward in USD as a decimal string, e.g. "1.50".
    pub reward: String,
    #[serde(default)]
    pub keywords: String,
    #[serde(default = "default_allotted_time")]
    pub allotted_time: DurationSpec,
    #[serde(default = "default_expiration")]
    pub expiration: DurationSpec,
    #[serde(default = "default_auto_approve")]
    pub auto_approve: DurationSpec,
}

fn default_allotted_time() -> DurationSpec {
    DurationSpec::hours(1)
}

fn default_expiration() -> DurationSpec {
    DurationSpec::days(7)
}

fn default_auto_approve() -> DurationSpec {
    DurationSpec::days(3)
}

/// Duration written as days, hours and minutes.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct DurationSpec {
    #[serde(default)]
    pub days: u64,
    #[serde(default)]
    pub hours: u64,
    #[serde(default)]
    pub minutes: u64,
}

impl DurationSpec {
    pub fn days(days: u64) -> Self {
        Self {
            days,
            ..Self::default()
        }
    }

    pub fn hours(hours: u64) -> Self {
        Self {
            hours,
            ..Self::default()
        }
    }

    /// Total seconds, or `None` if the value does not fit in a `u64`.
    pub fn as_seconds(&self) -> Option<u64> {
        self.days
            .checked_mul(24)?
            .checked_add(self.hours)?
            .checked_mul(60)?
            .checked_add(self.minutes)?
            .checked_mul(60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_study() {
        let config: StudyConfig = toml::from_str(r#"title = "Reach task""#).unwrap();
        assert_eq!(config.title, "Reach task");
        assert_eq!(config.total_available_places, 0);
        assert!(!config.compensation);
        assert!(config.description.summary_para.is_empty());
        assert!(config.prolific.is_none());
        assert!(config.mturk.is_none());
    }

    #[test]
    fn test_approval_cutoff_integer() {
        let screeners: Screeners = toml::from_str("restrict_approval_rate = 97").unwrap();
        assert_eq!(screeners.approval_cutoff(), Some(97));
    }

    #[test]
    fn test_approval_cutoff_non_integer_defaults_to_99() {
        let screeners: Screeners = toml::from_str("restrict_approval_rate = 97.5").unwrap();
        assert_eq!(screeners.approval_cutoff(), Some(99));
    }

    #[test]
    fn test_approval_cutoff_flag() {
        let on: Screeners = toml::from_str("restrict_approval_rate = true").unwrap();
        assert_eq!(on.approval_cutoff(), Some(99));
        let off: Screeners = toml::from_str("restrict_approval_rate = false").unwrap();
        assert_eq!(off.approval_cutoff(), None);
        assert_eq!(Screeners::default().approval_cutoff(), None);
    }

    #[test]
    fn test_approval_cutoff_out_of_range() {
        assert_eq!(ApprovalRateCutoff::Percent(150.0).percent(), Some(99));
        assert_eq!(ApprovalRateCutoff::Percent(0.0).percent(), None);
    }

    #[test]
    fn test_duration_spec_seconds() {
        let d = DurationSpec {
            days: 1,
            hours: 2,
            minutes: 3,
        };
        assert_eq!(d.as_seconds(), Some(((24 + 2) * 60 + 3) * 60));
        assert_eq!(DurationSpec::default().as_seconds(), Some(0));
        assert_eq!(DurationSpec::days(u64::MAX).as_seconds(), None);
    }

    #[test]
    fn test_compensation_places_follow_worker_list() {
        let mut config: StudyConfig = toml::from_str(
            r#"
title = "Comp"
total_available_places = 30
compensation = true
workers_to_compensate = ["A1", "A2"]
"#,
        )
        .unwrap();
        assert_eq!(config.places(), 2);
        config.compensation = false;
        assert_eq!(config.places(), 30);
    }

    #[test]
    fn test_mturk_defaults() {
        let config: MturkStudyConfig = toml::from_str(r#"reward = "1.50""#).unwrap();
        assert_eq!(config.allotted_time.as_seconds(), Some(3600));
        assert_eq!(config.expiration.as_seconds(), Some(7 * 86400));
        assert_eq!(config.auto_approve.as_seconds(), Some(3 * 86400));
    }
}
