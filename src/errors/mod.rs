//! # Error Types
//!
//! Error types for the Credplane credentials control plane, built on `thiserror`.
//!
//! Every fallible operation in this crate returns [`Result`]. Callers embedding
//! this crate behind an HTTP surface can use [`CredplaneError::status_code`] to
//! map errors onto response classes; secret resolution failures additionally
//! carry a stable machine-readable code via [`SecretError::error_code`].

use crate::domain::{CredentialsDefinition, CredentialsError};
use crate::secrets::SecretError;

/// Custom result type for Credplane operations
pub type Result<T> = std::result::Result<T, CredplaneError>;

/// Main error type for the Credplane credentials control plane
#[derive(thiserror::Error, Debug)]
pub enum CredplaneError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// Definition source errors (a full-set pull from a source failed)
    #[error("Definition source error: {message}")]
    Source {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Aggregated validation errors; never reports a single violation when
    /// several are present
    #[error("Validation failed with {} error(s)", errors.len())]
    Validation { errors: Vec<CredentialsError> },

    /// Permission check failed for a specific mutation
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Operation targeted a name with no existing definition
    #[error("No {resource} found with name '{name}'")]
    NotFound { resource: String, name: String },

    /// Create targeted an existing name, or a merge detected a duplicate
    #[error("Conflict for '{name}': {message}")]
    Conflict { name: String, message: String },

    /// Conditional update precondition mismatch; carries the current stored
    /// definition and its etag so the caller can diff and retry
    #[error("Precondition failed for '{name}': expected etag did not match '{etag}'")]
    PreconditionFailed {
        name: String,
        etag: String,
        current: Box<CredentialsDefinition>,
    },

    /// Secret reference resolution errors
    #[error(transparent)]
    Secret(#[from] SecretError),

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl CredplaneError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a definition source error
    pub fn source<S: Into<String>>(message: S) -> Self {
        Self::Source { message: message.into(), source: None }
    }

    /// Create a validation error from collected violations
    pub fn validation(errors: Vec<CredentialsError>) -> Self {
        Self::Validation { errors }
    }

    /// Create an unauthorized error
    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, N: Into<String>>(resource: R, name: N) -> Self {
        Self::NotFound { resource: resource.into(), name: name.into() }
    }

    /// Create a conflict error
    pub fn conflict<N: Into<String>, M: Into<String>>(name: N, message: M) -> Self {
        Self::Conflict { name: name.into(), message: message.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Get the HTTP status code that should be returned for this error
    pub fn status_code(&self) -> u16 {
        match self {
            CredplaneError::Config { .. } => 500,
            CredplaneError::Serialization { .. } => 400,
            CredplaneError::Source { .. } => 500,
            CredplaneError::Validation { .. } => 400,
            CredplaneError::Unauthorized { .. } => 403,
            CredplaneError::NotFound { .. } => 404,
            CredplaneError::Conflict { .. } => 409,
            CredplaneError::PreconditionFailed { .. } => 412,
            CredplaneError::Secret(error) => error.status_code(),
            CredplaneError::Internal { .. } => 500,
        }
    }

    /// Collected violations for a validation failure, empty otherwise
    pub fn validation_errors(&self) -> &[CredentialsError] {
        match self {
            CredplaneError::Validation { errors } => errors,
            _ => &[],
        }
    }
}

impl From<serde_json::Error> for CredplaneError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<config::ConfigError> for CredplaneError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}
