//! GCP Secret Manager backend implementation
//!
//! Talks to the Secret Manager v1 REST API with a bearer token.
//!
//! ## Requests
//!
//! - get: `GET {endpoint}/projects/{project}/secrets/{name}`
//! - create: `POST {endpoint}/projects/{project}/secrets?secretId={name}`
//! - add version: `POST {endpoint}/projects/{project}/secrets/{name}:addVersion`
//!
//! Project and secret ids are appended as percent-encoded path segments, so
//! `/`, `?` and `#` in a name stay inside that name's own resource path. Ids
//! that are empty, `.` or `..` are rejected before any request is sent.
//!
//! ## Error classification
//!
//! Failures are mapped from the HTTP status, never from message text:
//!
//! | Status              | Error                          |
//! |---------------------|--------------------------------|
//! | 404                 | [`StoreError::NotFound`]       |
//! | 409                 | [`StoreError::AlreadyExists`]  |
//! | 401, 403            | [`StoreError::PermissionDenied`] |
//! | 408, 429, 5xx       | [`StoreError::Unavailable`]    |
//! | other non-2xx       | [`StoreError::Backend`]        |
//!
//! Transport failures (connect, timeout) are [`StoreError::Unavailable`].
//!
//! ## Authentication
//!
//! An access token is taken from configuration. With the `gcp` feature and no
//! token configured, one is minted from the service account key named by
//! `GOOGLE_APPLICATION_CREDENTIALS`.

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use zeroize::Zeroizing;

use super::error::{Result, StoreError};
use super::{ContainerHandle, SecretStore, SecretStoreType, VersionHandle};
use crate::config::ConfigError;
use crate::replication::ReplicationPolicy;

/// Public Secret Manager v1 endpoint
pub const DEFAULT_ENDPOINT: &str = "https://secretmanager.googleapis.com/v1";

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[cfg(feature = "gcp")]
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

// Longest error body excerpt carried into an error message
const MAX_ERROR_DETAIL: usize = 300;

/// Configuration for the GCP Secret Manager backend
#[derive(Clone)]
pub struct GcpStoreConfig {
    /// API base URL, without a trailing slash
    pub endpoint: String,

    /// Bearer token; when absent, service account auth is attempted
    pub access_token: Option<Zeroizing<String>>,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for GcpStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl fmt::Debug for GcpStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcpStoreConfig")
            .field("endpoint", &self.endpoint)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// GCP Secret Manager backend
pub struct GcpSecretStore {
    client: Client,
    endpoint: Url,
    access_token: Zeroizing<String>,
}

impl fmt::Debug for GcpSecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcpSecretStore")
            .field("endpoint", &self.endpoint.as_str())
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

impl GcpSecretStore {
    /// Create a new backend, resolving credentials if no token was configured
    pub async fn new(config: GcpStoreConfig) -> std::result::Result<Self, ConfigError> {
        let access_token = match config.access_token {
            Some(token) if !token.is_empty() => token,
            _ => Zeroizing::new(mint_access_token().await?),
        };

        let client = Client::builder().timeout(config.timeout).build().map_err(|e| {
            ConfigError::invalid(format!("failed to build HTTP client for Secret Manager: {}", e))
        })?;

        let endpoint = Url::parse(config.endpoint.trim_end_matches('/')).map_err(|e| {
            ConfigError::invalid(format!("invalid endpoint '{}': {}", config.endpoint, e))
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(ConfigError::invalid(format!(
                "endpoint '{}' cannot carry a resource path",
                config.endpoint
            )));
        }

        debug!(endpoint = %endpoint, "Initialized GCP Secret Manager backend");

        Ok(Self { client, endpoint, access_token })
    }

    /// `{endpoint}/{segments...}` with every segment percent-encoded
    fn url(&self, segments: &[&str]) -> Result<Url> {
        for segment in segments {
            validate_segment(segment)?;
        }

        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::backend(format!("endpoint {} has no path", self.endpoint)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(self.access_token.as_str())
    }

    async fn send(&self, builder: RequestBuilder, name: &str) -> Result<String> {
        let response = self.authorized(builder).send().await.map_err(|e| {
            warn!(secret_name = %name, error = %e, "Secret Manager request failed");
            StoreError::unavailable(format!("request for secret '{}' failed: {}", name, e))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            StoreError::unavailable(format!("reading response for secret '{}' failed: {}", name, e))
        })?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(classify_status(status, name, &body))
        }
    }
}

#[async_trait]
impl SecretStore for GcpSecretStore {
    #[instrument(skip(self), fields(store = "gcp"))]
    async fn get_container(&self, project_id: &str, name: &str) -> Result<ContainerHandle> {
        let url = self.url(&["projects", project_id, "secrets", name])?;
        let body = self.send(self.client.get(url), name).await?;

        let secret: SecretResource = parse_body(&body, name)?;
        let mut container = ContainerHandle::new(project_id, name);
        if let Some(resource) = secret.name {
            container = container.with_name(resource);
        }
        container.replication = secret.replication.map(ReplicationPolicy::from);
        Ok(container)
    }

    #[instrument(skip(self, policy), fields(store = "gcp", policy = %policy))]
    async fn create_container(
        &self,
        project_id: &str,
        name: &str,
        policy: &ReplicationPolicy,
    ) -> Result<ContainerHandle> {
        validate_segment(name)?;
        let request = self
            .client
            .post(self.url(&["projects", project_id, "secrets"])?)
            .query(&[("secretId", name)])
            .json(&CreateSecretRequest { replication: WireReplication::from(policy) });

        let body = self.send(request, name).await?;

        let secret: SecretResource = parse_body(&body, name)?;
        let mut container = ContainerHandle::new(project_id, name);
        if let Some(resource) = secret.name {
            container = container.with_name(resource);
        }
        Ok(container.with_replication(policy.clone()))
    }

    #[instrument(
        skip(self, container, payload),
        fields(store = "gcp", container = %container.name)
    )]
    async fn append_version(
        &self,
        container: &ContainerHandle,
        payload: &[u8],
    ) -> Result<VersionHandle> {
        let name = container.secret_id.as_str();
        validate_segment(name)?;
        let target = format!("{}:addVersion", name);
        let project_id = container.project_id.as_str();
        let url = self.url(&["projects", project_id, "secrets", target.as_str()])?;

        let data = Zeroizing::new(base64::engine::general_purpose::STANDARD.encode(payload));
        let request = self
            .client
            .post(url)
            .json(&AddVersionRequest { payload: WirePayload { data: data.as_str() } });

        let body = self.send(request, name).await?;

        let version: VersionResource = parse_body(&body, name)?;
        Ok(VersionHandle { name: version.name })
    }

    fn store_type(&self) -> SecretStoreType {
        SecretStoreType::GcpSecretManager
    }
}

#[cfg(feature = "gcp")]
async fn mint_access_token() -> std::result::Result<String, ConfigError> {
    let key_path = std::env::var("GOOGLE_APPLICATION_CREDENTIALS")
        .map_err(|_| ConfigError::MissingParameter("access-token"))?;

    let key = yup_oauth2::read_service_account_key(&key_path).await.map_err(|e| {
        ConfigError::credentials(format!(
            "failed to read service account key '{}': {}",
            key_path, e
        ))
    })?;

    let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key).build().await.map_err(
        |e| ConfigError::credentials(format!("failed to build GCP authenticator: {}", e)),
    )?;

    let token = auth
        .token(&[CLOUD_PLATFORM_SCOPE])
        .await
        .map_err(|e| ConfigError::credentials(format!("failed to obtain access token: {}", e)))?;

    token
        .token()
        .map(str::to_string)
        .ok_or_else(|| ConfigError::credentials("token response did not contain an access token"))
}

#[cfg(not(feature = "gcp"))]
async fn mint_access_token() -> std::result::Result<String, ConfigError> {
    Err(ConfigError::MissingParameter("access-token"))
}

/// Reject ids that a URL path cannot represent as a single segment
fn validate_segment(segment: &str) -> Result<()> {
    if matches!(segment, "" | "." | "..") {
        return Err(StoreError::backend(format!(
            "'{}' cannot be used as a Secret Manager resource id",
            segment
        )));
    }
    Ok(())
}

fn classify_status(status: StatusCode, name: &str, body: &str) -> StoreError {
    let detail = error_detail(body);
    match status {
        StatusCode::NOT_FOUND => StoreError::not_found(name),
        StatusCode::CONFLICT => StoreError::already_exists(name),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StoreError::permission_denied(format!("{} on secret '{}': {}", status, name, detail))
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            StoreError::unavailable(format!("{} on secret '{}': {}", status, name, detail))
        }
        s if s.is_server_error() => {
            StoreError::unavailable(format!("{} on secret '{}': {}", status, name, detail))
        }
        _ => StoreError::backend(format!("{} on secret '{}': {}", status, name, detail)),
    }
}

/// Pull the human-readable message out of a Google API error body
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => body.chars().take(MAX_ERROR_DETAIL).collect(),
    }
}

fn parse_body<'a, T: Deserialize<'a>>(body: &'a str, name: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| {
        StoreError::backend(format!("unexpected response for secret '{}': {}", name, e))
    })
}

#[derive(Debug, Serialize)]
struct CreateSecretRequest {
    replication: WireReplication,
}

#[derive(Debug, Serialize)]
struct AddVersionRequest<'a> {
    payload: WirePayload<'a>,
}

#[derive(Serialize)]
struct WirePayload<'a> {
    data: &'a str,
}

impl fmt::Debug for WirePayload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WirePayload([REDACTED])")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum WireReplication {
    Automatic {},
    UserManaged { replicas: Vec<WireReplica> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct WireReplica {
    location: String,
}

impl From<&ReplicationPolicy> for WireReplication {
    fn from(policy: &ReplicationPolicy) -> Self {
        match policy {
            ReplicationPolicy::Automatic => Self::Automatic {},
            ReplicationPolicy::UserManaged { locations } => Self::UserManaged {
                replicas: locations
                    .iter()
                    .map(|location| WireReplica { location: location.clone() })
                    .collect(),
            },
        }
    }
}

impl From<WireReplication> for ReplicationPolicy {
    fn from(wire: WireReplication) -> Self {
        match wire {
            WireReplication::Automatic {} => Self::Automatic,
            WireReplication::UserManaged { replicas } => Self::UserManaged {
                locations: replicas.into_iter().map(|replica| replica.location).collect(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct SecretResource {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    replication: Option<WireReplication>,
}

#[derive(Debug, Deserialize)]
struct VersionResource {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
