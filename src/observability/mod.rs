//! # Observability Infrastructure
//!
//! Structured logging for provisioning runs.

pub mod logging;

pub use logging::{init_logging, log_run_config};
