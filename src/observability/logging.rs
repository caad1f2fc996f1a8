//! # Structured Logging
//!
//! Subscriber setup and span helpers. Secret values must never appear in a log
//! field; only names, steps, and counts are recorded.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig, SeedConfig};
use crate::errors::{Error, Result};

/// Create a tracing span for one record's upsert
///
/// ```rust,ignore
/// let span = upsert_span!("db-password", 0);
/// ```
#[macro_export]
macro_rules! upsert_span {
    ($secret_name:expr, $index:expr) => {
        tracing::info_span!(
            "upsert_secret",
            secret_name = %$secret_name,
            index = $index
        )
    };
    ($secret_name:expr, $index:expr, $($field:tt)*) => {
        tracing::info_span!(
            "upsert_secret",
            secret_name = %$secret_name,
            index = $index,
            $($field)*
        )
    };
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured default level. An already
/// installed subscriber (e.g. in tests) is left in place.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let default_level = LevelFilter::from_level(config.default_level());
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env()
        .map_err(|e| Error::logging(format!("invalid RUST_LOG directive: {}", e)))?;

    let installed = match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            tracing_subscriber::fmt()
                .json()
                .with_current_span(true)
                .with_env_filter(filter)
                .finish(),
        ),
        LogFormat::Pretty => tracing::subscriber::set_global_default(
            tracing_subscriber::fmt().pretty().with_env_filter(filter).finish(),
        ),
    };

    if installed.is_err() {
        // Subscriber already set elsewhere (e.g. integration tests); ignore.
    }
    Ok(())
}

/// Log the run configuration at startup
pub fn log_run_config(config: &SeedConfig) {
    tracing::info!(
        project_id = %config.project_id,
        secrets_file = %config.secrets_file.display(),
        replication = %config.replication,
        endpoint = %config.store.endpoint,
        timeout_secs = config.store.timeout.as_secs(),
        "secretseed run configuration"
    );
}
