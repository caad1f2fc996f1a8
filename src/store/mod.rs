//! # Secret Store
//!
//! The capability the provisioner needs from a secret-management backend:
//! look up a container, create one with a replication policy, and append a
//! version to it.
//!
//! Failures are classified structurally by [`StoreError`] so that callers can
//! tell "does not exist" and "already exists" apart from real failures without
//! inspecting message text.
//!
//! ## Backends
//!
//! - [`gcp::GcpSecretStore`]: Google Cloud Secret Manager over the v1 REST API
//! - [`memory::InMemorySecretStore`]: process-local store for tests

pub mod error;
pub mod gcp;
pub mod memory;

pub use error::{Result, StoreError};
pub use gcp::{GcpSecretStore, GcpStoreConfig};
pub use memory::InMemorySecretStore;

use async_trait::async_trait;
use std::fmt;

use crate::replication::ReplicationPolicy;

/// Type of secret store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretStoreType {
    /// Google Cloud Secret Manager
    GcpSecretManager,
    /// Process-local store
    InMemory,
}

impl SecretStoreType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GcpSecretManager => "gcp_secret_manager",
            Self::InMemory => "in_memory",
        }
    }
}

impl fmt::Display for SecretStoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A secret container as seen by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    /// Full resource name, e.g. `projects/my-project/secrets/db-password`
    pub name: String,
    /// Project the container lives in, as given by the caller
    pub project_id: String,
    /// Secret identifier within the project, exactly as read from the input
    pub secret_id: String,
    /// Replication policy reported by the backend, when it reports one
    pub replication: Option<ReplicationPolicy>,
}

impl ContainerHandle {
    /// Handle for `secret_id` in `project_id` with the canonical resource name
    pub fn new(project_id: impl Into<String>, secret_id: impl Into<String>) -> Self {
        let project_id = project_id.into();
        let secret_id = secret_id.into();
        Self {
            name: container_resource_name(&project_id, &secret_id),
            project_id,
            secret_id,
            replication: None,
        }
    }

    /// Replace the resource name with the one the backend reported
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_replication(mut self, policy: ReplicationPolicy) -> Self {
        self.replication = Some(policy);
        self
    }
}

/// A version appended to a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionHandle {
    /// Full resource name, e.g. `projects/my-project/secrets/db-password/versions/3`
    pub name: String,
}

/// Resource name of a container inside a project
pub fn container_resource_name(project_id: &str, secret_name: &str) -> String {
    format!("projects/{}/secrets/{}", project_id, secret_name)
}

/// Trait for secret store backends
///
/// Implementations must be Send + Sync for use in async contexts. They must
/// not log payload bytes and must not retry on their own.
#[async_trait]
pub trait SecretStore: Send + Sync + fmt::Debug {
    /// Look up a container.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] if the container does not exist
    async fn get_container(&self, project_id: &str, name: &str) -> Result<ContainerHandle>;

    /// Create a container with the given replication policy.
    ///
    /// # Errors
    /// - [`StoreError::AlreadyExists`] if another writer created it first
    async fn create_container(
        &self,
        project_id: &str,
        name: &str,
        policy: &ReplicationPolicy,
    ) -> Result<ContainerHandle>;

    /// Append a new version holding `payload` to an existing container.
    async fn append_version(
        &self,
        container: &ContainerHandle,
        payload: &[u8],
    ) -> Result<VersionHandle>;

    /// Get the backend type identifier
    fn store_type(&self) -> SecretStoreType;
}

#[async_trait]
impl<T: SecretStore + ?Sized> SecretStore for &T {
    async fn get_container(&self, project_id: &str, name: &str) -> Result<ContainerHandle> {
        (**self).get_container(project_id, name).await
    }

    async fn create_container(
        &self,
        project_id: &str,
        name: &str,
        policy: &ReplicationPolicy,
    ) -> Result<ContainerHandle> {
        (**self).create_container(project_id, name, policy).await
    }

    async fn append_version(
        &self,
        container: &ContainerHandle,
        payload: &[u8],
    ) -> Result<VersionHandle> {
        (**self).append_version(container, payload).await
    }

    fn store_type(&self) -> SecretStoreType {
        (**self).store_type()
    }
}
