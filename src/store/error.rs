//! Error types for secret store operations.

use thiserror::Error;

/// Result type for secret store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors a secret store can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Container does not exist.
    #[error("Secret not found: {name}")]
    NotFound { name: String },

    /// Container was already created, possibly by a concurrent writer.
    #[error("Secret already exists: {name}")]
    AlreadyExists { name: String },

    /// Credentials missing, expired, or lacking permission.
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    /// Transient failure: timeout, connection error, throttling, or server error.
    #[error("Backend unavailable: {message}")]
    Unavailable { message: String },

    /// The backend rejected the request.
    #[error("Backend error: {message}")]
    Backend { message: String },
}

impl StoreError {
    /// Create a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create an already exists error.
    pub fn already_exists(name: impl Into<String>) -> Self {
        Self::AlreadyExists { name: name.into() }
    }

    /// Create a permission denied error.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied { message: message.into() }
    }

    /// Create a transient unavailability error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }

    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend { message: message.into() }
    }

    /// Whether re-running later may succeed without any change to the input.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
