//! # secretseed
//!
//! Batch provisioning of secrets into Google Cloud Secret Manager from a
//! `name,value` CSV file.
//!
//! ## Architecture
//!
//! ```text
//! CSV file ──▶ records ──┐
//!                        ├──▶ provision (sequential upsert) ──▶ store (Secret Manager)
//! flags ──▶ replication ─┘
//! ```
//!
//! ## Core Components
//!
//! - **records**: parses and validates the input file into ordered [`SecretRecord`]s
//! - **replication**: resolves the run's single [`ReplicationPolicy`]
//! - **store**: the [`SecretStore`] capability and its GCP and in-memory backends
//! - **provision**: the idempotent create-if-absent-then-append-version loop
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use secretseed::{
//!     records::parse_records, store::InMemorySecretStore, Provisioner, ReplicationPolicy,
//! };
//!
//! # async fn example() -> secretseed::Result<()> {
//! let records = parse_records("name,value\ndb-password,s3cr3t\n".as_bytes())?;
//! let policy = ReplicationPolicy::resolve(false, "us-east1")?;
//!
//! let provisioner = Provisioner::new(InMemorySecretStore::new());
//! let report = provisioner.run("my-project", &policy, &records).await?;
//! assert_eq!(report.processed(), 1);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod observability;
pub mod provision;
pub mod records;
pub mod replication;
pub mod store;

// Re-export commonly used types and traits
pub use config::{ConfigError, SeedConfig};
pub use errors::{Error, Result};
pub use provision::{ProvisionError, ProvisionReport, ProvisionStep, Provisioner};
pub use records::{FormatError, SecretRecord};
pub use replication::ReplicationPolicy;
pub use store::{SecretStore, StoreError};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
