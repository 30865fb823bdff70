//! Read/display projections of credential definitions.
//!
//! Views are built fresh on every listing call and never persisted; the
//! authoritative de-duplicated definition list is the composite source's
//! `credentials_definitions`, not the view list.

use crate::domain::CredentialsDefinition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a definition was loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialsSource {
    /// Persisted via the storage contract
    Storage,
    /// Declared in static configuration
    Config,
}

impl CredentialsSource {
    /// Get the wire representation of this source
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Storage => "storage",
            Self::Config => "config",
        }
    }
}

impl FromStr for CredentialsSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "storage" => Ok(Self::Storage),
            "config" => Ok(Self::Config),
            _ => Err(format!("Unknown credentials source: {}", s)),
        }
    }
}

impl fmt::Display for CredentialsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifying metadata of a viewed (or just-mutated) definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialsViewMetadata {
    /// Credential type discriminator
    #[serde(rename = "type")]
    pub type_name: String,
    /// Account name
    pub name: String,
    /// Origin of this definition
    pub source: CredentialsSource,
    /// Opaque revision tag usable as an `update_if_match` precondition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// When the definition was last mutated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

/// A single field-scoped violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsError {
    /// Stable machine-readable error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Offending field, when the violation is field-scoped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl CredentialsError {
    /// Create an error without field scope
    pub fn new<C: Into<String>, M: Into<String>>(code: C, message: M) -> Self {
        Self { code: code.into(), message: message.into(), field: None }
    }

    /// Create a field-scoped error
    pub fn field<C: Into<String>, M: Into<String>, F: Into<String>>(
        code: C,
        message: M,
        field: F,
    ) -> Self {
        Self { code: code.into(), message: message.into(), field: Some(field.into()) }
    }
}

/// Validity status of a viewed definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialsStatus {
    /// Whether the definition deserialized and validated cleanly
    pub valid: bool,
    /// Collected errors when it did not
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<CredentialsError>,
}

impl CredentialsStatus {
    /// A valid status with no errors
    pub fn valid() -> Self {
        Self { valid: true, errors: Vec::new() }
    }

    /// Record an error and mark the status invalid
    pub fn add_error(&mut self, error: CredentialsError) {
        self.valid = false;
        self.errors.push(error);
    }
}

/// Read/display projection combining metadata, spec, and status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialsView {
    pub metadata: CredentialsViewMetadata,
    /// The definition body as free-form JSON
    pub spec: serde_json::Value,
    pub status: CredentialsStatus,
}

impl CredentialsView {
    /// Build a valid view of a definition from the given source
    pub fn of(definition: &CredentialsDefinition, source: CredentialsSource) -> Self {
        Self {
            metadata: CredentialsViewMetadata {
                type_name: definition.type_name.clone(),
                name: definition.name.clone(),
                source,
                etag: None,
                last_modified: None,
            },
            spec: serde_json::to_value(definition).unwrap_or(serde_json::Value::Null),
            status: CredentialsStatus::valid(),
        }
    }
}

/// Stable error codes surfaced in [`CredentialsError`] values.
pub mod codes {
    pub const INVALID_NAME: &str = "credentials.invalidName";
    pub const DUPLICATE_NAME: &str = "credentials.duplicateName";
    pub const NOT_FOUND: &str = "credentials.notFound";
    pub const UNAUTHORIZED: &str = "credentials.unauthorized";
    pub const UNKNOWN_TYPE: &str = "credentials.unknownType";
    pub const INVALID_SECRET_FORMAT: &str = "credentials.invalidSecretFormat";
    pub const UNKNOWN_SECRET_ENGINE: &str = "credentials.unknownSecretEngine";
    pub const EXTERNAL_SECRET_DENIED: &str = "credentials.externalSecretDenied";
}
