//! Marketplace catalogue identifiers.
//!
//! These ids belong to the marketplaces' own screener and system
//! qualification catalogues. They are not derived from anything and change
//! only when a marketplace revises its catalogue.

/// Catalogue snapshot these ids were taken from.
pub const TAXONOMY_VERSION: &str = "2023-01";

pub mod prolific {
    pub const AGE_RANGE_CLASS: &str = "web.eligibility.models.AgeRangeEligibilityRequirement";
    pub const APPROVAL_RATE_CLASS: &str =
        "web.eligibility.models.ApprovalRateEligibilityRequirement";
    pub const MULTI_SELECT_CLASS: &str =
        "web.eligibility.models.MultiSelectAnswerEligibilityRequirement";
    pub const SELECT_CLASS: &str = "web.eligibility.models.SelectAnswerEligibilityRequirement";

    pub const AGE_QUESTION: &str = "54ac6ea9fdf99b2204feb893";

    pub const FLUENT_LANGUAGES_QUESTION: &str = "58c6b44ea4dd0a4799361afc";
    pub const FLUENT_LANGUAGES_TEXT: &str = "Which of the following languages are you fluent in?";
    pub const ENGLISH_ANSWER_INDEX: u32 = 19;

    pub const DEMENTIA_QUESTION: &str = "59cb6f8c21454d000194c364";
    pub const DEMENTIA_TEXT: &str =
        "Have you ever been diagnosed with mild cognitive impairment or dementia?";

    pub const MS_QUESTION: &str = "5d825cdfbe876600168b6d16";
    pub const MS_TEXT: &str = "Have you ever been diagnosed with multiple sclerosis (MS)?";

    pub const MENTAL_HEALTH_QUESTION: &str = "58c951b0a4dd0a08048f3017";
    pub const MENTAL_HEALTH_TEXT: &str = "Do you have any diagnosed mental health condition that is uncontrolled (by medication or intervention) and which has a significant impact on your daily life / activities?";

    pub const NORMAL_VISION_QUESTION: &str = "57a0c4d2717b34954e81b919";
    pub const NORMAL_VISION_TEXT: &str = "Do you have normal or corrected-to-normal vision?";
    pub const NORMAL_VISION_HELP: &str = "For example, you can see colour normally, and if you need glasses, you are wearing them or contact lenses";

    pub const OWN_VR_QUESTION: &str = "5eac255ff716eb05e0ed3853";
    pub const OWN_VR_TEXT: &str = "Do you own a VR (Virtual Reality) headset?";
}

pub mod mturk {
    /// Worker locale.
    pub const LOCALE: &str = "00000000000000000071";
    /// Percentage of assignments approved.
    pub const PERCENT_APPROVED: &str = "000000000000000000L0";
    /// Number of HITs approved.
    pub const NUMBER_APPROVED: &str = "00000000000000000040";

    /// Below this many approved HITs the approval rate is reported as 100%.
    pub const APPROVAL_RATE_MIN_HISTORY: i64 = 100;
}
