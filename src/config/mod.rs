//! # Configuration Management
//!
//! Validated run configuration. The CLI collects raw invocation parameters
//! (flags, environment variables, `.env`) and hands them to
//! [`SeedConfig::from_params`], which is the single place where they are
//! checked and the replication policy is resolved.

use std::path::PathBuf;
use std::time::Duration;

use zeroize::Zeroizing;

use crate::replication::ReplicationPolicy;
use crate::store::gcp::{GcpStoreConfig, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS};

/// Errors in invocation parameters. Reported before the input file is read.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A required parameter is missing or empty
    #[error("{0} is required")]
    MissingParameter(&'static str),

    /// Both or neither replication modes were selected
    #[error("either --global or --secrets-location must be provided, but not both")]
    ReplicationMode,

    /// A parameter has an unusable value
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Credentials could not be loaded
    #[error("credentials error: {0}")]
    Credentials(String),
}

impl ConfigError {
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid(message.into())
    }

    pub fn credentials<S: Into<String>>(message: S) -> Self {
        Self::Credentials(message.into())
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable, multi-line
    Pretty,
}

/// Logging configuration
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Default to `debug` instead of `info` when `RUST_LOG` is unset
    pub verbose: bool,
}

impl LoggingConfig {
    pub fn default_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

/// Raw invocation parameters, before validation
#[derive(Debug, Clone, Default)]
pub struct RunParams {
    pub project_id: Option<String>,
    pub secrets_file: Option<PathBuf>,
    pub global: bool,
    pub secrets_location: Option<String>,
    pub access_token: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Validated configuration for one provisioning run
#[derive(Debug, Clone)]
pub struct SeedConfig {
    /// Target project
    pub project_id: String,

    /// CSV file with `name,value` rows
    pub secrets_file: PathBuf,

    /// Policy applied to every container created in this run
    pub replication: ReplicationPolicy,

    /// Backend connection settings
    pub store: GcpStoreConfig,
}

impl SeedConfig {
    /// Validate raw parameters.
    ///
    /// Checks, in order: project id, secrets file, replication mode, timeout.
    pub fn from_params(params: RunParams) -> Result<Self, ConfigError> {
        let project_id =
            non_empty(params.project_id).ok_or(ConfigError::MissingParameter("project-id"))?;

        let secrets_file = params
            .secrets_file
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or(ConfigError::MissingParameter("secrets-file"))?;

        let location_list = params.secrets_location.unwrap_or_default();
        let replication = ReplicationPolicy::resolve(params.global, &location_list)?;

        let timeout_secs = params.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::invalid("timeout must be at least 1 second"));
        }

        let store = GcpStoreConfig {
            endpoint: non_empty(params.endpoint).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            access_token: non_empty(params.access_token).map(Zeroizing::new),
            timeout: Duration::from_secs(timeout_secs),
        };

        Ok(Self { project_id, secrets_file, replication, store })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
