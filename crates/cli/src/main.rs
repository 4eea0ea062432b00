mod options;
mod prompt;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use sha2::{Digest, Sha256};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fieldwork_core::payload::{DirectoryLayouts, WhitespaceMinifier};
use fieldwork_core::{
    list_deployments, load_settings, load_study_config, validate_settings, DecisionProvider,
    DeployError, DeploymentProvider, EnvCredentials, HistoryStore, Marketplace, MturkClient,
    MturkDeployment, ProlificClient, ProlificDeployment, QuestionPayloadBuilder, RequestSigner,
    SanitizedSettings, Settings, StudyConfig,
};

use options::{Action, RunOptions};
use prompt::TerminalDecisions;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        match e.downcast_ref::<DeployError>() {
            Some(deploy) => {
                let report = deploy.report();
                error!("{}", report.message);
                if let Some(detail) = &report.provider_detail {
                    error!("Provider detail: {}", detail);
                }
            }
            None => error!("Fatal error: {:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let opts = RunOptions::from_env()?;
    info!("fieldwork {} ({:?} on {})", VERSION, opts.action, opts.marketplace);

    info!("Loading settings from {:?}", opts.config_path);
    let settings = load_settings(&opts.config_path)
        .with_context(|| format!("Failed to load settings from {:?}", opts.config_path))?;
    validate_settings(&settings).context("Settings validation failed")?;

    let credentials = EnvCredentials;
    let sanitized = SanitizedSettings::new(&settings, &credentials);
    let settings_json = serde_json::to_string(&sanitized).unwrap_or_default();
    let settings_hash = format!("{:x}", Sha256::digest(settings_json.as_bytes()));
    info!("Settings loaded (hash {})", &settings_hash[..16]);

    let history = HistoryStore::new(&settings.experiments_dir);
    let decisions: Arc<dyn DecisionProvider> = Arc::new(TerminalDecisions);

    match opts.marketplace {
        Marketplace::Prolific => {
            let token = settings
                .prolific
                .token(&credentials)
                .context("Prolific token unavailable")?;
            let client = Arc::new(
                ProlificClient::new(&settings.prolific, token)
                    .context("Failed to create Prolific client")?,
            );
            let deployment = ProlificDeployment::new(
                Arc::clone(&client) as Arc<dyn DeploymentProvider>,
                client.clone(),
                history,
                decisions,
            );

            match opts.action {
                Action::Deploy => {
                    let study = load_study(&settings, &opts)?;
                    let draft = deployment.draft(&opts.experiment, &study).await?;
                    info!(
                        "{} draft {} ({})",
                        if draft.updated { "Updated" } else { "Created" },
                        draft.id,
                        draft.preview_url
                    );
                }
                Action::Publish => {
                    for ack in deployment.publish_drafts(&opts.experiment).await? {
                        info!(
                            "Study {} is now {}",
                            ack.id,
                            ack.status.as_deref().unwrap_or("published")
                        );
                    }
                }
                Action::List => print_deployments(client.as_ref(), &opts.experiment).await?,
            }
        }
        Marketplace::Mturk => {
            let signer = RequestSigner::from_environment(&settings.mturk.region)
                .await
                .context("Failed to load AWS credentials for MTurk")?;
            let http = reqwest::Client::builder()
                .timeout(Duration::from_secs(settings.mturk.timeout_secs as u64))
                .build()
                .context("Failed to create HTTP client")?;
            let client = Arc::new(MturkClient::from_settings(
                http,
                signer,
                &settings.mturk,
                opts.sandbox,
            ));
            info!(
                "Using MTurk {} endpoint {}",
                if opts.sandbox { "sandbox" } else { "production" },
                settings.mturk.endpoint_for(opts.sandbox)
            );

            match opts.action {
                Action::Deploy => {
                    let study = load_study(&settings, &opts)?;
                    let mut deployment = MturkDeployment::new(
                        Arc::clone(&client) as Arc<dyn DeploymentProvider>,
                        client.clone(),
                        history,
                        decisions,
                    )
                    .with_database_url(&settings.datastore.database_url)
                    .with_sandbox(opts.sandbox);
                    if let Some(dir) = &settings.layouts.dir {
                        deployment = deployment.with_payloads(QuestionPayloadBuilder::new(
                            Arc::new(DirectoryLayouts::new(dir)),
                            Arc::new(WhitespaceMinifier::new()),
                        ));
                    }

                    let outcome = deployment
                        .deploy(&opts.experiment, &study, Local::now())
                        .await?;
                    info!(
                        "Posted {} HIT(s) for '{}': {}",
                        outcome.hit_ids.len(),
                        opts.experiment,
                        outcome.hit_ids.join(", ")
                    );
                }
                Action::Publish => {
                    info!("MTurk HITs are live as soon as they are created; nothing to publish");
                }
                Action::List => print_deployments(client.as_ref(), &opts.experiment).await?,
            }
        }
    }

    Ok(())
}

fn load_study(settings: &Settings, opts: &RunOptions) -> Result<StudyConfig> {
    let mut study = load_study_config(&settings.experiments_dir, &opts.experiment)
        .with_context(|| format!("Failed to load study config for '{}'", opts.experiment))?;
    if opts.compensation && !study.compensation {
        study = fieldwork_core::normalize_study_config(
            fieldwork_core::config::COMPENSATION_EXPERIMENT,
            study,
        )
        .context("Study config is not valid for a compensation run")?;
    }
    info!(
        "Loaded study '{}' ({} place(s){})",
        study.title,
        study.places(),
        if study.compensation { ", compensation" } else { "" }
    );
    Ok(study)
}

async fn print_deployments(provider: &dyn DeploymentProvider, experiment: &str) -> Result<()> {
    let records = list_deployments(provider, experiment).await?;
    if records.is_empty() {
        info!("No deployments found for '{}'", experiment);
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
