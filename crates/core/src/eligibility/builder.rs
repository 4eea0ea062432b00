//! Screeners to requirement lists.

use serde_json::json;
use tracing::{info, warn};

use crate::config::Screeners;
use crate::provider::Marketplace;

use super::taxonomy::{mturk as mt, prolific as pl};
use super::{
    ActionsGuarded, Comparator, EligibilityRequirement, Locale, MturkRequirement,
    ProlificRequirement, RequirementAttribute, RequirementQuery,
};

/// Answers to the questions the builder cannot settle from config alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EligibilityChoices {
    /// Also require a minimum number of approved tasks alongside an
    /// approval-rate cutoff.
    pub exclude_under_100_approved: bool,
    /// Drop every requirement so the task can be previewed in a sandbox.
    pub disable_in_sandbox: bool,
}

/// Builds the ordered requirement list for one marketplace.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityRuleBuilder {
    marketplace: Marketplace,
    sandbox: bool,
}

impl EligibilityRuleBuilder {
    pub fn new(marketplace: Marketplace) -> Self {
        Self {
            marketplace,
            sandbox: false,
        }
    }

    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    /// Whether the under-100-approved question applies to these screeners.
    ///
    /// MTurk reports a 100% approval rate for every worker with fewer than
    /// 100 approved tasks, so a rate cutoff alone admits newcomers.
    pub fn asks_under_100_exclusion(&self, screeners: &Screeners) -> bool {
        self.marketplace == Marketplace::Mturk && screeners.approval_cutoff().is_some()
    }

    /// Whether the sandbox question applies: requirements exist and the
    /// target is a sandbox.
    pub fn asks_sandbox_disable(&self, screeners: &Screeners, consent_gate: bool) -> bool {
        if !self.sandbox {
            return false;
        }
        consent_gate
            || !self
                .build(screeners, None, &EligibilityChoices::default())
                .is_empty()
    }

    /// Build the requirement list.
    ///
    /// `consent_gate` is the id of the experiment's own qualification; when
    /// given, its holders are excluded first (MTurk only).
    pub fn build(
        &self,
        screeners: &Screeners,
        consent_gate: Option<&str>,
        choices: &EligibilityChoices,
    ) -> Vec<EligibilityRequirement> {
        let requirements = match self.marketplace {
            Marketplace::Prolific => prolific_requirements(screeners),
            Marketplace::Mturk => mturk_requirements(screeners, consent_gate, choices),
        };

        if self.sandbox && choices.disable_in_sandbox && !requirements.is_empty() {
            info!(
                "Dropping {} requirement(s) so the sandbox task can be previewed",
                requirements.len()
            );
            return Vec::new();
        }

        requirements
    }

    /// Requirement list of a compensation task: only holders of the
    /// compensation qualification may see it.
    pub fn compensation_gate(qualification_id: &str) -> Vec<EligibilityRequirement> {
        vec![EligibilityRequirement::Mturk(MturkRequirement::exists(
            qualification_id,
        ))]
    }
}

fn select_answer(
    rule_class: &str,
    query: RequirementQuery,
    answer: &str,
    index: u32,
) -> EligibilityRequirement {
    EligibilityRequirement::Prolific(ProlificRequirement {
        rule_class: rule_class.to_string(),
        query: Some(query),
        attributes: vec![RequirementAttribute {
            name: answer.to_string(),
            value: json!(true),
            index: Some(index),
        }],
    })
}

fn range_attributes(min_name: &str, min: u32, max_name: &str, max: u32) -> Vec<RequirementAttribute> {
    vec![
        RequirementAttribute {
            name: min_name.to_string(),
            value: json!(min),
            index: None,
        },
        RequirementAttribute {
            name: max_name.to_string(),
            value: json!(max),
            index: None,
        },
    ]
}

fn prolific_requirements(s: &Screeners) -> Vec<EligibilityRequirement> {
    if s.restrict_location.is_some()
        || !s.qualification_blocklist.is_empty()
        || !s.qualification_allowlist.is_empty()
    {
        warn!("Location and qualification lists are not supported on Prolific, ignoring them");
    }

    let mut out = Vec::new();

    if let Some([min, max]) = s.age_range {
        out.push(EligibilityRequirement::Prolific(ProlificRequirement {
            rule_class: pl::AGE_RANGE_CLASS.to_string(),
            query: Some(RequirementQuery::new(pl::AGE_QUESTION, None)),
            attributes: range_attributes("min_age", min, "max_age", max),
        }));
    }

    let approval = match (s.approval_rate_range, s.approval_cutoff()) {
        (Some([min, max]), _) => Some((min, max)),
        (None, Some(cutoff)) => Some((cutoff, 100)),
        (None, None) => None,
    };
    if let Some((min, max)) = approval {
        out.push(EligibilityRequirement::Prolific(ProlificRequirement {
            rule_class: pl::APPROVAL_RATE_CLASS.to_string(),
            query: None,
            attributes: range_attributes(
                "minimum_approval_rate",
                min,
                "maximum_approval_rate",
                max,
            ),
        }));
    }

    if s.fluent_english {
        out.push(select_answer(
            pl::MULTI_SELECT_CLASS,
            RequirementQuery::new(pl::FLUENT_LANGUAGES_QUESTION, Some(pl::FLUENT_LANGUAGES_TEXT)),
            "English",
            pl::ENGLISH_ANSWER_INDEX,
        ));
    }
    if s.exclude_dementia {
        out.push(select_answer(
            pl::SELECT_CLASS,
            RequirementQuery::new(pl::DEMENTIA_QUESTION, Some(pl::DEMENTIA_TEXT)),
            "No",
            1,
        ));
    }
    if s.exclude_ms {
        out.push(select_answer(
            pl::SELECT_CLASS,
            RequirementQuery::new(pl::MS_QUESTION, Some(pl::MS_TEXT)),
            "No",
            1,
        ));
    }
    if s.exclude_mental_health_impact {
        out.push(select_answer(
            pl::SELECT_CLASS,
            RequirementQuery::new(pl::MENTAL_HEALTH_QUESTION, Some(pl::MENTAL_HEALTH_TEXT)),
            "No",
            1,
        ));
    }
    if s.normal_vision {
        let mut query = RequirementQuery::new(pl::NORMAL_VISION_QUESTION, Some(pl::NORMAL_VISION_TEXT));
        query.participant_help_text = Some(pl::NORMAL_VISION_HELP.to_string());
        out.push(select_answer(pl::SELECT_CLASS, query, "Yes", 0));
    }
    if s.own_vr {
        out.push(select_answer(
            pl::SELECT_CLASS,
            RequirementQuery::new(pl::OWN_VR_QUESTION, Some(pl::OWN_VR_TEXT)),
            "Yes",
            0,
        ));
    }

    out
}

fn mturk_requirements(
    s: &Screeners,
    consent_gate: Option<&str>,
    choices: &EligibilityChoices,
) -> Vec<EligibilityRequirement> {
    if s.age_range.is_some()
        || s.approval_rate_range.is_some()
        || s.fluent_english
        || s.exclude_dementia
        || s.exclude_ms
        || s.exclude_mental_health_impact
        || s.normal_vision
        || s.own_vr
    {
        warn!("Demographic screeners are not supported on MTurk, ignoring them");
    }

    let mut out: Vec<MturkRequirement> = Vec::new();

    if let Some(qid) = consent_gate {
        out.push(MturkRequirement::does_not_exist(qid));
    }
    out.extend(
        s.qualification_blocklist
            .iter()
            .map(|qid| MturkRequirement::does_not_exist(qid)),
    );
    out.extend(
        s.qualification_allowlist
            .iter()
            .map(|qid| MturkRequirement::exists(qid)),
    );

    match s.restrict_location.as_deref() {
        Some("US") => out.push(MturkRequirement {
            qualification_type_id: mt::LOCALE.to_string(),
            comparator: Comparator::In,
            integer_values: Vec::new(),
            locale_values: vec![Locale {
                country: "US".to_string(),
                subdivision: None,
            }],
            actions_guarded: ActionsGuarded::DiscoverPreviewAndAccept,
        }),
        Some(other) => warn!("Location restriction '{}' is not supported, ignoring it", other),
        None => {}
    }

    if let Some(cutoff) = s.approval_cutoff() {
        out.push(MturkRequirement {
            qualification_type_id: mt::PERCENT_APPROVED.to_string(),
            comparator: Comparator::GreaterThanOrEqualTo,
            integer_values: vec![cutoff as i64],
            locale_values: Vec::new(),
            actions_guarded: ActionsGuarded::DiscoverPreviewAndAccept,
        });
        if choices.exclude_under_100_approved {
            out.push(MturkRequirement {
                qualification_type_id: mt::NUMBER_APPROVED.to_string(),
                comparator: Comparator::GreaterThan,
                integer_values: vec![mt::APPROVAL_RATE_MIN_HISTORY],
                locale_values: Vec::new(),
                actions_guarded: ActionsGuarded::DiscoverPreviewAndAccept,
            });
        }
    }

    out.into_iter().map(EligibilityRequirement::Mturk).collect()
}
