//! Account-scoped secret resolution with time-of-use authorization tracking.

use crate::auth::{Authorization, PermissionEvaluator, PermissionTarget, Principal};
use crate::secrets::engine::SecretEngineRegistry;
use crate::secrets::error::SecretError;
use crate::secrets::reference::{
    EncryptedSecretReference, StandardSecretParameter, UserSecretReference,
};
use crate::secrets::types::{SecretString, UserSecret, DEFAULT_DATA_KEY};
use base64::Engine as _;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves secret references on behalf of accounts and remembers which
/// account used which secret.
///
/// Access decisions are deferred to time of use: resolution records
/// `(account, reference)` pairs, and [`can_access_account_with_secrets`]
/// re-checks, for each tracked reference, whether a principal still holds
/// READ on the underlying secret and WRITE on the account itself —
/// independent of when the secret was originally resolved.
///
/// [`can_access_account_with_secrets`]: CredentialsSecretManager::can_access_account_with_secrets
pub struct CredentialsSecretManager {
    engines: Arc<SecretEngineRegistry>,
    permission_evaluator: Arc<dyn PermissionEvaluator>,
    refs_by_account: DashMap<String, HashSet<UserSecretReference>>,
}

impl CredentialsSecretManager {
    pub fn new(
        engines: Arc<SecretEngineRegistry>,
        permission_evaluator: Arc<dyn PermissionEvaluator>,
    ) -> Self {
        Self { engines, permission_evaluator, refs_by_account: DashMap::new() }
    }

    /// The engine registry backing this manager
    pub fn engines(&self) -> &SecretEngineRegistry {
        &self.engines
    }

    /// Fetch and decrypt a user secret without account tracking
    pub async fn user_secret(
        &self,
        reference: &UserSecretReference,
    ) -> Result<UserSecret, SecretError> {
        let engine = self.engines.engine(reference.engine_identifier())?;
        engine.validate(reference).await?;
        engine.decrypt(reference).await
    }

    /// Resolve a user secret string for the given account.
    ///
    /// The requested data key comes from the reference's `k` parameter,
    /// falling back to [`DEFAULT_DATA_KEY`]; a missing key is a
    /// decryption-class failure. The `(account, reference)` pair is tracked
    /// once the secret itself resolves, before key extraction, so even a
    /// mis-keyed reference is subject to later time-of-use checks.
    pub async fn user_secret_string(
        &self,
        reference: &UserSecretReference,
        account_name: &str,
    ) -> Result<SecretString, SecretError> {
        let secret = self.user_secret(reference).await?;
        self.track(account_name, reference);
        let key = reference
            .standard_parameter(StandardSecretParameter::Key)
            .unwrap_or(DEFAULT_DATA_KEY);
        secret.secret_string(key)
    }

    /// Resolve a user secret's binary payload for the given account.
    ///
    /// Honors the `e=base64` encoding parameter for binary payloads stored
    /// as base64 text.
    pub async fn user_secret_bytes(
        &self,
        reference: &UserSecretReference,
        account_name: &str,
    ) -> Result<Vec<u8>, SecretError> {
        let value = self.user_secret_string(reference, account_name).await?;
        match reference.standard_parameter(StandardSecretParameter::Encoding) {
            Some("base64") => base64::engine::general_purpose::STANDARD
                .decode(value.expose())
                .map_err(|e| {
                    SecretError::DecryptionFailure(format!("invalid base64 payload: {}", e))
                }),
            Some(other) => Err(SecretError::InvalidFormat(format!(
                "unsupported secret encoding '{}'",
                other
            ))),
            None => Ok(value.expose().as_bytes().to_vec()),
        }
    }

    /// Resolve an external (operator-scoped) secret.
    ///
    /// No admin check happens here: resolving an already-stored external
    /// reference is a load-time operation. Defining a *new* external
    /// reference is gated at save time by the secret-reference validator.
    pub async fn external_secret_string(
        &self,
        reference: &EncryptedSecretReference,
    ) -> Result<SecretString, SecretError> {
        let engine = self.engines.engine(reference.engine_identifier())?;
        engine.decrypt_external(reference).await
    }

    /// References tracked for the given account
    pub fn tracked_references(&self, account_name: &str) -> HashSet<UserSecretReference> {
        self.refs_by_account
            .get(account_name)
            .map(|refs| refs.clone())
            .unwrap_or_default()
    }

    /// Whether the principal may use the given account, re-checking every
    /// tracked secret reference at time of use.
    ///
    /// Admins always pass. Otherwise the principal must still hold READ on
    /// every secret the account resolved, and WRITE on the account itself.
    /// A reference whose secret can no longer be fetched denies access.
    pub async fn can_access_account_with_secrets(
        &self,
        principal: &Principal,
        account_name: &str,
    ) -> bool {
        if principal.is_admin() {
            return true;
        }
        for reference in self.tracked_references(account_name) {
            let secret = match self.user_secret(&reference).await {
                Ok(secret) => secret,
                Err(error) => {
                    warn!(
                        account = account_name,
                        engine = reference.engine_identifier(),
                        %error,
                        "Tracked secret reference no longer resolves; denying account access"
                    );
                    return false;
                }
            };
            if !self.permission_evaluator.has_permission(
                principal,
                PermissionTarget::UserSecret(&secret),
                Authorization::Read,
            ) {
                debug!(
                    account = account_name,
                    principal = principal.name(),
                    "Principal lost READ on a tracked secret"
                );
                return false;
            }
        }
        self.permission_evaluator.has_permission(
            principal,
            PermissionTarget::Account(account_name),
            Authorization::Write,
        )
    }

    /// Whether the principal may read the given decrypted secret
    pub fn can_read_user_secret(&self, principal: &Principal, secret: &UserSecret) -> bool {
        self.permission_evaluator.has_permission(
            principal,
            PermissionTarget::UserSecret(secret),
            Authorization::Read,
        )
    }

    /// Drop tracked references for an account (called when the account is
    /// removed from the live cache)
    pub fn forget_account(&self, account_name: &str) {
        self.refs_by_account.remove(account_name);
    }

    fn track(&self, account_name: &str, reference: &UserSecretReference) {
        self.refs_by_account
            .entry(account_name.to_string())
            .or_default()
            .insert(reference.clone());
    }
}
