pub mod batch;
pub mod config;
pub mod decision;
pub mod eligibility;
pub mod history;
pub mod payload;
pub mod provider;
pub mod qualification;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod workflow;

pub use batch::{plan_batches, DeploymentBatch};
pub use config::{
    load_settings, load_settings_from_str, load_study_config, normalize_study_config,
    validate_settings, ConfigError, CredentialSource, EnvCredentials, SanitizedSettings, Settings,
    StudyConfig,
};
pub use decision::{DecisionError, DecisionKey, DecisionProvider};
pub use eligibility::{EligibilityChoices, EligibilityRequirement, EligibilityRuleBuilder};
pub use history::{HistoryError, HistoryKey, HistoryStore};
pub use payload::{PayloadError, QuestionPayloadBuilder};
pub use provider::{
    DeploymentProvider, Marketplace, MturkClient, ProlificClient, ProviderError, RequestSigner,
    WorkspaceDirectory,
};
pub use qualification::{QualificationBackend, QualificationStateManager};
pub use workflow::{
    list_deployments, DeployError, ErrorReport, MturkDeployment, ProlificDeployment,
};
