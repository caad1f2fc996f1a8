//! # Command Line Interface
//!
//! Maps flags and environment variables onto a [`SeedConfig`], runs the
//! provisioning pipeline, and turns any fatal error into a structured log event
//! and exit status 1.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use crate::config::{LogFormat, LoggingConfig, RunParams, SeedConfig};
use crate::errors::{Error, Result};
use crate::observability::{init_logging, log_run_config};
use crate::provision::{ProvisionReport, Provisioner};
use crate::records::read_secrets_file;
use crate::store::{GcpSecretStore, SecretStore};

#[derive(Parser, Debug)]
#[command(name = "secretseed")]
#[command(about = "Seed secrets into Google Cloud Secret Manager from a name,value CSV file")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Google Cloud project to provision secrets into
    #[arg(long, env = "SECRETSEED_PROJECT_ID")]
    pub project_id: Option<String>,

    /// Path to the CSV file containing secrets (name,value)
    #[arg(long, env = "SECRETSEED_SECRETS_FILE")]
    pub secrets_file: Option<PathBuf>,

    /// Comma-separated list of locations for user-managed replication
    #[arg(long, env = "SECRETSEED_SECRETS_LOCATION")]
    pub secrets_location: Option<String>,

    /// Use automatic replication (global secret)
    #[arg(long, env = "SECRETSEED_GLOBAL")]
    pub global: bool,

    /// OAuth access token for Secret Manager (falls back to GOOGLE_OAUTH_ACCESS_TOKEN)
    #[arg(long, env = "SECRETSEED_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Secret Manager API base URL
    #[arg(long, env = "SECRETSEED_GCP_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = "SECRETSEED_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Log output format
    #[arg(long, value_enum, env = "SECRETSEED_LOG_FORMAT", default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig { format: self.log_format, verbose: self.verbose }
    }

    pub fn into_params(self) -> RunParams {
        let access_token =
            self.access_token.or_else(|| std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN").ok());

        RunParams {
            project_id: self.project_id,
            secrets_file: self.secrets_file,
            global: self.global,
            secrets_location: self.secrets_location,
            access_token,
            endpoint: self.endpoint,
            timeout_secs: self.timeout,
        }
    }
}

/// Run the CLI
pub async fn run_cli() -> anyhow::Result<()> {
    // Load .env file if it exists (optional - won't fail if missing)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(&cli.logging_config())?;

    match run(cli.into_params()).await {
        Ok(report) => {
            info!(
                count = report.processed(),
                created = report.created(),
                reused = report.reused(),
                "Successfully uploaded all secrets"
            );
            Ok(())
        }
        Err(e) => {
            log_failure(&e);
            std::process::exit(1);
        }
    }
}

/// Validate parameters, connect to Secret Manager, and provision the file.
pub async fn run(params: RunParams) -> Result<ProvisionReport> {
    let config = SeedConfig::from_params(params)?;
    log_run_config(&config);

    let store = GcpSecretStore::new(config.store.clone()).await?;

    provision_from_file(&config, store).await
}

/// Read the configured secrets file and upsert every record into `store`.
///
/// The file is fully parsed before the store is called; a malformed file
/// makes no backend calls. The store is dropped when this returns.
pub async fn provision_from_file<S: SecretStore>(
    config: &SeedConfig,
    store: S,
) -> Result<ProvisionReport> {
    let records = read_secrets_file(&config.secrets_file)?;
    info!(count = records.len(), store = %store.store_type(), "Found secrets to upload");

    let provisioner = Provisioner::new(store);
    let report = provisioner.run(&config.project_id, &config.replication, &records).await?;

    Ok(report)
}

fn log_failure(err: &Error) {
    match err {
        Error::Provision(e) => error!(
            stage = err.stage(),
            secret_name = %e.secret,
            step = %e.step,
            transient = e.source.is_transient(),
            error = %e.source,
            "Error uploading secrets"
        ),
        Error::Format(e) => error!(stage = err.stage(), error = %e, "Error reading secrets file"),
        Error::Config(e) => error!(stage = err.stage(), error = %e, "Invalid configuration"),
        Error::Logging(e) => error!(stage = err.stage(), error = %e, "Logging setup failed"),
    }
}
