//! # Error Handling
//!
//! Top-level error type for a provisioning run. Each stage owns its own error
//! enum; this module folds them into one type so the CLI can report any fatal
//! condition uniformly.

use crate::config::ConfigError;
use crate::provision::ProvisionError;
use crate::records::FormatError;

/// Custom result type for secretseed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for a provisioning run
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid or contradictory invocation parameters
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Malformed or unreadable secrets file
    #[error("Input format error: {0}")]
    Format(#[from] FormatError),

    /// First failed upsert of the run
    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    /// Logging subsystem could not be initialised
    #[error("Logging error: {0}")]
    Logging(String),
}

impl Error {
    /// Create a new logging error
    pub fn logging<S: Into<String>>(message: S) -> Self {
        Self::Logging(message.into())
    }

    /// Short, stable label for the failing stage, used as a structured log field
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Format(_) => "input",
            Self::Provision(_) => "provision",
            Self::Logging(_) => "logging",
        }
    }
}
