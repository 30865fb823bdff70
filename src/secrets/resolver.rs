//! Definition-level secret resolution.

use crate::domain::CredentialsDefinition;
use crate::secrets::error::SecretError;
use crate::secrets::manager::CredentialsSecretManager;
use crate::secrets::reference::{EncryptedSecretReference, UserSecretReference};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Replaces secret references in a definition's string fields with resolved
/// plaintext.
///
/// Applied when a stored definition is loaded for parsing. Definitions are
/// immutable by contract, so resolution produces a new definition rather than
/// mutating in place. Non-string fields and strings that match neither
/// grammar pass through untouched; a string that *does* match a grammar but
/// fails to parse or resolve fails the whole definition — a half-resolved
/// account must never reach a parser.
pub struct DefinitionResolver {
    manager: Arc<CredentialsSecretManager>,
}

impl DefinitionResolver {
    pub fn new(manager: Arc<CredentialsSecretManager>) -> Self {
        Self { manager }
    }

    /// Resolve all secret references in the definition's spec fields.
    ///
    /// User secret resolutions are tracked against the definition's account
    /// name for time-of-use checks.
    pub async fn resolve(
        &self,
        definition: &CredentialsDefinition,
    ) -> Result<CredentialsDefinition, SecretError> {
        let mut resolved = definition.clone();
        for (field, value) in resolved.spec.iter_mut() {
            let Some(text) = value.as_str() else { continue };
            if UserSecretReference::is_user_secret(text) {
                let reference = UserSecretReference::parse(text)?;
                let plaintext =
                    self.manager.user_secret_string(&reference, &definition.name).await?;
                debug!(account = %definition.name, field = %field, "Resolved user secret reference");
                *value = Value::String(plaintext.expose().to_string());
            } else if EncryptedSecretReference::is_encrypted_secret(text) {
                let reference = EncryptedSecretReference::parse(text)?;
                let plaintext = self.manager.external_secret_string(&reference).await?;
                debug!(account = %definition.name, field = %field, "Resolved external secret reference");
                *value = Value::String(plaintext.expose().to_string());
            }
        }
        Ok(resolved)
    }
}
