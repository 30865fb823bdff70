//! Secret engine contract and registry.

use crate::secrets::error::SecretError;
use crate::secrets::reference::{EncryptedSecretReference, UserSecretReference};
use crate::secrets::types::UserSecret;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Backend capable of resolving secret references.
///
/// Implementations wrap concrete secret stores (cloud secret managers, object
/// storage, Vault, ...). Resolution is synchronous from the caller's point of
/// view and may block on network I/O; deadlines are inherited from the caller.
#[async_trait]
pub trait SecretEngine: Send + Sync {
    /// Engine identifier referenced by secret URIs
    fn identifier(&self) -> &str;

    /// Validate that a reference is well-formed for this engine without
    /// fetching the secret
    async fn validate(&self, reference: &UserSecretReference) -> Result<(), SecretError>;

    /// Fetch and decrypt the referenced user secret
    async fn decrypt(&self, reference: &UserSecretReference) -> Result<UserSecret, SecretError>;

    /// Fetch and decrypt an external (operator-scoped) secret.
    ///
    /// Engines that only serve user secrets keep the default.
    async fn decrypt_external(
        &self,
        reference: &EncryptedSecretReference,
    ) -> Result<crate::secrets::SecretString, SecretError> {
        Err(SecretError::DecryptionFailure(format!(
            "engine '{}' does not support external secrets",
            reference.engine_identifier()
        )))
    }
}

/// Registry of secret engines keyed by engine identifier
#[derive(Default)]
pub struct SecretEngineRegistry {
    engines: HashMap<String, Arc<dyn SecretEngine>>,
}

impl SecretEngineRegistry {
    /// Create a new registry with no engines
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret engine
    pub fn register(&mut self, engine: Arc<dyn SecretEngine>) {
        let identifier = engine.identifier().to_string();
        info!(engine = %identifier, "Registering secret engine");
        self.engines.insert(identifier, engine);
    }

    /// Check if an engine is registered under the given identifier
    pub fn has_engine(&self, identifier: &str) -> bool {
        self.engines.contains_key(identifier)
    }

    /// Get the engine registered under the given identifier
    pub fn engine(&self, identifier: &str) -> Result<Arc<dyn SecretEngine>, SecretError> {
        self.engines
            .get(identifier)
            .cloned()
            .ok_or_else(|| SecretError::UnknownEngine(identifier.to_string()))
    }

    /// Identifiers of all registered engines
    pub fn identifiers(&self) -> Vec<&str> {
        self.engines.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for SecretEngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretEngineRegistry")
            .field("engines", &self.engines.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Engine backed by a fixed map of named secrets.
///
/// Intended for tests and light deployments that declare secrets up front.
/// References select a secret with the `s` parameter.
pub struct StaticSecretEngine {
    identifier: String,
    secrets: HashMap<String, UserSecret>,
}

/// Parameter selecting a secret by name in a [`StaticSecretEngine`] reference
pub const SECRET_NAME_PARAMETER: &str = "s";

impl StaticSecretEngine {
    pub fn new<S: Into<String>>(identifier: S) -> Self {
        Self { identifier: identifier.into(), secrets: HashMap::new() }
    }

    /// Builder-style helper to add a named secret
    pub fn with_secret<S: Into<String>>(mut self, name: S, secret: UserSecret) -> Self {
        self.secrets.insert(name.into(), secret);
        self
    }

    fn secret_name<'a>(
        &self,
        reference: &'a UserSecretReference,
    ) -> Result<&'a str, SecretError> {
        reference.parameter(SECRET_NAME_PARAMETER).ok_or_else(|| {
            SecretError::InvalidFormat(format!(
                "engine '{}' requires the '{}' parameter",
                self.identifier, SECRET_NAME_PARAMETER
            ))
        })
    }
}

#[async_trait]
impl SecretEngine for StaticSecretEngine {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn validate(&self, reference: &UserSecretReference) -> Result<(), SecretError> {
        self.secret_name(reference).map(|_| ())
    }

    async fn decrypt(&self, reference: &UserSecretReference) -> Result<UserSecret, SecretError> {
        let name = self.secret_name(reference)?;
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| SecretError::NotFound(name.to_string()))
    }
}
