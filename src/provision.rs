//! # Upsert Orchestrator
//!
//! Drives a [`SecretStore`] through the per-secret upsert protocol:
//!
//! ```text
//! get_container ──found──────────────────────────────┐
//!       │                                            ▼
//!       └─NotFound─▶ create_container ─ok/AlreadyExists─▶ append_version ─▶ done
//! ```
//!
//! Records are processed one at a time, in input order. The first failure
//! aborts the run: later records are not touched and earlier ones are not
//! rolled back. Re-running the same input is safe because every step tolerates
//! a container that already exists.
//!
//! The replication policy only matters when a container is created; existing
//! containers keep whatever policy they were created with.

use std::fmt;

use tracing::{info, warn, Instrument};

use crate::records::SecretRecord;
use crate::replication::ReplicationPolicy;
use crate::store::{ContainerHandle, SecretStore, StoreError};

/// Protocol step at which a record failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    ExistenceCheck,
    Create,
    AppendVersion,
}

impl ProvisionStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExistenceCheck => "existence check",
            Self::Create => "create",
            Self::AppendVersion => "append version",
        }
    }
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The first fatal failure of a run, naming the secret and the step
#[derive(thiserror::Error, Debug)]
#[error("secret '{secret}' failed at step '{step}': {source}")]
pub struct ProvisionError {
    pub secret: String,
    pub step: ProvisionStep,
    #[source]
    pub source: StoreError,
}

impl ProvisionError {
    pub fn new(secret: impl Into<String>, step: ProvisionStep, source: StoreError) -> Self {
        Self { secret: secret.into(), step, source }
    }
}

/// How a record's container came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerOutcome {
    /// Created by this run
    Created,
    /// Already present before this run touched it
    Existing,
    /// Created by another writer between our check and our create
    CreatedConcurrently,
}

/// Result of upserting one record. Never carries the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub name: String,
    pub container: ContainerOutcome,
    /// Resource name of the appended version
    pub version: String,
}

/// Summary of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    pub outcomes: Vec<RecordOutcome>,
}

impl ProvisionReport {
    /// Number of records upserted
    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of containers this run created
    pub fn created(&self) -> usize {
        self.count(ContainerOutcome::Created)
    }

    /// Number of records appended to a container that was already there
    pub fn reused(&self) -> usize {
        self.processed() - self.created()
    }

    fn count(&self, outcome: ContainerOutcome) -> usize {
        self.outcomes.iter().filter(|o| o.container == outcome).count()
    }
}

/// Sequential upsert driver. Owns the store handle for the duration of the run.
#[derive(Debug)]
pub struct Provisioner<S: SecretStore> {
    store: S,
}

impl<S: SecretStore> Provisioner<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrow the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Release the store handle
    pub fn into_store(self) -> S {
        self.store
    }

    /// Upsert every record in order, stopping at the first failure.
    pub async fn run(
        &self,
        project_id: &str,
        policy: &ReplicationPolicy,
        records: &[SecretRecord],
    ) -> Result<ProvisionReport, ProvisionError> {
        let mut report = ProvisionReport { outcomes: Vec::with_capacity(records.len()) };

        for (index, record) in records.iter().enumerate() {
            let span = crate::upsert_span!(record.name(), index);
            let outcome = self.upsert(project_id, policy, record).instrument(span).await?;
            report.outcomes.push(outcome);
        }

        Ok(report)
    }

    async fn upsert(
        &self,
        project_id: &str,
        policy: &ReplicationPolicy,
        record: &SecretRecord,
    ) -> Result<RecordOutcome, ProvisionError> {
        let name = record.name();

        let (container, outcome) = match self.store.get_container(project_id, name).await {
            Ok(container) => (container, ContainerOutcome::Existing),
            Err(StoreError::NotFound { .. }) => self.create(project_id, policy, name).await?,
            Err(e) => {
                warn!(secret_name = %name, error = %e, "Existence check failed");
                return Err(ProvisionError::new(name, ProvisionStep::ExistenceCheck, e));
            }
        };

        info!(secret_name = %name, "Adding version to secret");
        let version = self.store.append_version(&container, record.value()).await.map_err(|e| {
            warn!(secret_name = %name, error = %e, "Adding version failed");
            ProvisionError::new(name, ProvisionStep::AppendVersion, e)
        })?;

        Ok(RecordOutcome { name: name.to_string(), container: outcome, version: version.name })
    }

    async fn create(
        &self,
        project_id: &str,
        policy: &ReplicationPolicy,
        name: &str,
    ) -> Result<(ContainerHandle, ContainerOutcome), ProvisionError> {
        info!(secret_name = %name, replication = %policy, "Creating secret");

        match self.store.create_container(project_id, name, policy).await {
            Ok(container) => Ok((container, ContainerOutcome::Created)),
            Err(StoreError::AlreadyExists { .. }) => {
                info!(secret_name = %name, "Secret was created concurrently, reusing it");
                Ok((ContainerHandle::new(project_id, name), ContainerOutcome::CreatedConcurrently))
            }
            Err(e) => {
                warn!(secret_name = %name, error = %e, "Creating secret failed");
                Err(ProvisionError::new(name, ProvisionStep::Create, e))
            }
        }
    }
}
