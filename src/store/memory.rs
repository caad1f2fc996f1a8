//! In-memory secret store.
//!
//! Holds containers and their versions in process memory. Every call is
//! recorded so tests can assert on the exact sequence of store operations,
//! and failures can be injected per operation and secret name.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use zeroize::Zeroizing;

use super::error::{Result, StoreError};
use super::{
    container_resource_name, ContainerHandle, SecretStore, SecretStoreType, VersionHandle,
};
use crate::replication::ReplicationPolicy;

/// Store operation, as recorded in the call log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    GetContainer,
    CreateContainer,
    AppendVersion,
}

/// One recorded call: which operation, for which secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub operation: StoreOperation,
    pub name: String,
}

struct StoredContainer {
    replication: ReplicationPolicy,
    versions: Vec<Zeroizing<Vec<u8>>>,
}

#[derive(Default)]
struct State {
    containers: HashMap<String, StoredContainer>,
    calls: Vec<StoreCall>,
    failures: HashMap<(StoreOperation, String), StoreError>,
    // resource name -> policy the "other writer" creates it with
    concurrent_creates: HashMap<String, ReplicationPolicy>,
    raced: HashSet<String>,
}

/// Process-local [`SecretStore`].
#[derive(Default)]
pub struct InMemorySecretStore {
    state: Mutex<State>,
}

impl fmt::Debug for InMemorySecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("InMemorySecretStore")
            .field("containers", &state.containers.len())
            .field("calls", &state.calls.len())
            .finish()
    }
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create a container with no versions
    pub fn with_container(self, project_id: &str, name: &str, policy: ReplicationPolicy) -> Self {
        self.lock().containers.insert(
            container_resource_name(project_id, name),
            StoredContainer { replication: policy, versions: Vec::new() },
        );
        self
    }

    /// Make `operation` on secret `name` fail with `error`
    pub fn fail_on(self, operation: StoreOperation, name: &str, error: StoreError) -> Self {
        self.lock().failures.insert((operation, name.to_string()), error);
        self
    }

    /// Simulate another writer creating `name` between the existence check and
    /// the create call. The first create attempt sees `AlreadyExists`.
    pub fn with_concurrent_create(
        self,
        project_id: &str,
        name: &str,
        policy: ReplicationPolicy,
    ) -> Self {
        self.lock()
            .concurrent_creates
            .insert(container_resource_name(project_id, name), policy);
        self
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Number of containers across all projects
    pub fn container_count(&self) -> usize {
        self.lock().containers.len()
    }

    /// Payloads of every version of a container, oldest first
    pub fn versions(&self, project_id: &str, name: &str) -> Option<Vec<Vec<u8>>> {
        self.lock()
            .containers
            .get(&container_resource_name(project_id, name))
            .map(|container| container.versions.iter().map(|v| v.to_vec()).collect())
    }

    /// Replication policy the container was created with
    pub fn replication(&self, project_id: &str, name: &str) -> Option<ReplicationPolicy> {
        self.lock()
            .containers
            .get(&container_resource_name(project_id, name))
            .map(|container| container.replication.clone())
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl State {
    fn record(&mut self, operation: StoreOperation, name: &str) -> Result<()> {
        self.calls.push(StoreCall { operation, name: name.to_string() });
        match self.failures.get(&(operation, name.to_string())) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get_container(&self, project_id: &str, name: &str) -> Result<ContainerHandle> {
        let mut state = self.lock();
        state.record(StoreOperation::GetContainer, name)?;

        let resource = container_resource_name(project_id, name);
        match state.containers.get(&resource) {
            Some(container) => Ok(ContainerHandle::new(project_id, name)
                .with_replication(container.replication.clone())),
            None => Err(StoreError::not_found(name)),
        }
    }

    async fn create_container(
        &self,
        project_id: &str,
        name: &str,
        policy: &ReplicationPolicy,
    ) -> Result<ContainerHandle> {
        let mut state = self.lock();
        state.record(StoreOperation::CreateContainer, name)?;

        let resource = container_resource_name(project_id, name);
        if !state.raced.contains(&resource) {
            if let Some(other) = state.concurrent_creates.get(&resource).cloned() {
                state.raced.insert(resource.clone());
                state.containers.insert(
                    resource.clone(),
                    StoredContainer { replication: other, versions: Vec::new() },
                );
            }
        }

        if state.containers.contains_key(&resource) {
            return Err(StoreError::already_exists(name));
        }

        state.containers.insert(
            resource,
            StoredContainer { replication: policy.clone(), versions: Vec::new() },
        );
        Ok(ContainerHandle::new(project_id, name).with_replication(policy.clone()))
    }

    async fn append_version(
        &self,
        container: &ContainerHandle,
        payload: &[u8],
    ) -> Result<VersionHandle> {
        let name = container.secret_id.as_str();
        let resource = container_resource_name(&container.project_id, name);

        let mut state = self.lock();
        state.record(StoreOperation::AppendVersion, name)?;

        let stored =
            state.containers.get_mut(&resource).ok_or_else(|| StoreError::not_found(name))?;
        stored.versions.push(Zeroizing::new(payload.to_vec()));

        Ok(VersionHandle { name: format!("{}/versions/{}", resource, stored.versions.len()) })
    }

    fn store_type(&self) -> SecretStoreType {
        SecretStoreType::InMemory
    }
}
