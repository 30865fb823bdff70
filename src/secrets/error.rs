//! Secret resolution error taxonomy.
//!
//! Each failure mode maps to a distinct caller-visible code and status class
//! because each demands a different caller response: a malformed reference is
//! a client error, a denied read is an authorization failure, and a broken
//! engine is a server-side fault.

/// Result type for secret operations
pub type Result<T> = std::result::Result<T, SecretError>;

/// Errors raised while parsing or resolving secret references
#[derive(thiserror::Error, Debug)]
pub enum SecretError {
    /// The reference string does not match either secret grammar
    #[error("Invalid secret reference format: {0}")]
    InvalidFormat(String),

    /// The acting principal may not read the referenced secret
    #[error("Access to secret denied: {0}")]
    AccessDenied(String),

    /// The engine failed to decrypt the referenced secret
    #[error("Failed to decrypt secret: {0}")]
    DecryptionFailure(String),

    /// The secret decrypted but does not contain the requested data key
    #[error("Secret has no data key '{key}'")]
    MissingDataKey { key: String },

    /// No engine is registered under the reference's engine identifier
    #[error("Unknown secret engine identifier: {0}")]
    UnknownEngine(String),

    /// The engine has no secret matching the reference parameters
    #[error("Secret not found: {0}")]
    NotFound(String),
}

impl SecretError {
    /// Stable machine-readable code for this failure mode
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidFormat(_) => "secret.invalidFormat",
            Self::AccessDenied(_) => "secret.accessDenied",
            Self::DecryptionFailure(_) => "secret.decryptionFailure",
            Self::MissingDataKey { .. } => "secret.missingDataKey",
            Self::UnknownEngine(_) => "secret.unknownEngine",
            Self::NotFound(_) => "secret.notFound",
        }
    }

    /// HTTP status class for this failure mode
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidFormat(_) => 400,
            Self::AccessDenied(_) => 403,
            Self::NotFound(_) => 404,
            Self::DecryptionFailure(_) | Self::MissingDataKey { .. } | Self::UnknownEngine(_) => {
                500
            }
        }
    }
}
