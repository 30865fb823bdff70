//! Validation and authorization front-door for definition storage.
//!
//! Every mutation passes two gates before reaching the store: structural
//! validation by a pluggable validator chain (violations collected, never
//! short-circuited) and authorization against the *existing stored* value —
//! never the incoming payload, which would allow privilege escalation by
//! writing a permissions block the caller likes better.

pub mod validators;

pub use validators::{
    CredentialsDefinitionValidator, KnownTypeValidator, NameValidator, SecretReferenceValidator,
    ValidationErrors, DEFAULT_NAME_PATTERN,
};

use crate::auth::{Authorization, PermissionEvaluator, PermissionTarget, Principal};
use crate::domain::{codes, CredentialsDefinition, CredentialsView, CredentialsViewMetadata, Revision};
use crate::errors::{CredplaneError, Result};
use crate::repository::CompositeCredentialsRepository;
use crate::storage::CredentialsDefinitionStore;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// The mutation being validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialsDefinitionCommand {
    Create,
    Update,
    Save,
}

impl fmt::Display for CredentialsDefinitionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let command = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Save => "save",
        };
        write!(f, "{}", command)
    }
}

/// Service wrapper enforcing permissions and validations over a
/// [`CredentialsDefinitionStore`].
pub struct CredentialsDefinitionService {
    store: Arc<dyn CredentialsDefinitionStore>,
    permission_evaluator: Arc<dyn PermissionEvaluator>,
    validators: Vec<Arc<dyn CredentialsDefinitionValidator>>,
    repositories: Arc<CompositeCredentialsRepository>,
}

impl CredentialsDefinitionService {
    pub fn new(
        store: Arc<dyn CredentialsDefinitionStore>,
        permission_evaluator: Arc<dyn PermissionEvaluator>,
        validators: Vec<Arc<dyn CredentialsDefinitionValidator>>,
        repositories: Arc<CompositeCredentialsRepository>,
    ) -> Self {
        Self { store, permission_evaluator, validators, repositories }
    }

    /// Whether `name` is taken anywhere: in storage or in any live
    /// repository of any type
    async fn is_name_in_use(&self, name: &str) -> Result<bool> {
        Ok(self.store.find_by_name(name).await?.is_some() || self.repositories.has(name))
    }

    /// Whether the principal lacks WRITE on the existing access-controlled
    /// definition (or live credentials) under `name`.
    ///
    /// Evaluated against the stored value, not the incoming one. A name with
    /// no access-control metadata anywhere denies nobody.
    async fn should_deny_write(&self, principal: &Principal, name: &str) -> Result<bool> {
        let permissions = match self.store.find_by_name(name).await? {
            Some(existing) => existing.permissions(),
            None => None,
        };
        let permissions = permissions.or_else(|| self.repositories.permissions_of(name));
        Ok(match permissions {
            Some(permissions) => !self.permission_evaluator.has_permission(
                principal,
                PermissionTarget::Permissions(&permissions),
                Authorization::Write,
            ),
            None => false,
        })
    }

    /// Validate a definition for the given command, collecting all
    /// violations.
    ///
    /// Returns a validation failure listing every violation, or an
    /// unauthorized error when the principal may not overwrite the existing
    /// definition.
    pub async fn validate(
        &self,
        definition: &CredentialsDefinition,
        principal: &Principal,
        command: CredentialsDefinitionCommand,
    ) -> Result<()> {
        let mut errors = ValidationErrors::new();
        let name = definition.name();
        tracing::debug!(name, command = %command, "Validating credentials definition");
        let name_in_use = self.is_name_in_use(name).await?;
        if command == CredentialsDefinitionCommand::Update && !name_in_use {
            errors.reject_field(
                "name",
                codes::NOT_FOUND,
                "Cannot update an account which does not exist",
            );
        }
        if name_in_use {
            if command == CredentialsDefinitionCommand::Create {
                errors.reject_field(
                    "name",
                    codes::DUPLICATE_NAME,
                    "Cannot create a new account with the same name as an existing one",
                );
            }
            if self.should_deny_write(principal, name).await? {
                return Err(CredplaneError::unauthorized(
                    "Unauthorized to overwrite existing account",
                ));
            }
        }
        for validator in &self.validators {
            validator.validate(definition, &mut errors, principal);
        }
        errors.into_result()
    }

    pub async fn create(
        &self,
        definition: CredentialsDefinition,
        principal: &Principal,
    ) -> Result<CredentialsViewMetadata> {
        self.validate(&definition, principal, CredentialsDefinitionCommand::Create).await?;
        info!(name = %definition.name(), principal = %principal.name(), "Creating account");
        self.store.create(definition, Some(principal.name())).await
    }

    pub async fn save(
        &self,
        definition: CredentialsDefinition,
        principal: &Principal,
    ) -> Result<CredentialsViewMetadata> {
        self.validate(&definition, principal, CredentialsDefinitionCommand::Save).await?;
        info!(name = %definition.name(), principal = %principal.name(), "Saving account");
        self.store.save(definition, Some(principal.name())).await
    }

    pub async fn update(
        &self,
        definition: CredentialsDefinition,
        principal: &Principal,
    ) -> Result<CredentialsViewMetadata> {
        self.validate(&definition, principal, CredentialsDefinitionCommand::Update).await?;
        info!(name = %definition.name(), principal = %principal.name(), "Updating account");
        self.store.update(definition, Some(principal.name())).await
    }

    /// Conditional update gated on the stored etag, for retry-with-merge
    /// flows
    pub async fn update_if_match(
        &self,
        definition: CredentialsDefinition,
        if_match: &[String],
        principal: &Principal,
    ) -> Result<CredentialsViewMetadata> {
        self.validate(&definition, principal, CredentialsDefinitionCommand::Update).await?;
        self.store.update_if_match(definition, if_match, Some(principal.name())).await
    }

    /// Upsert a batch.
    ///
    /// Every element is validated and all violations are collected before
    /// the batch fails as a whole; persistence of a passing batch is
    /// per-entry and not transactional.
    pub async fn save_all(
        &self,
        definitions: Vec<CredentialsDefinition>,
        principal: &Principal,
    ) -> Result<Vec<CredentialsView>> {
        let mut errors = ValidationErrors::new();
        for definition in &definitions {
            let name = definition.name();
            if self.should_deny_write(principal, name).await? {
                errors.reject_field(
                    format!("{}.name", name),
                    codes::UNAUTHORIZED,
                    "Unauthorized to overwrite account",
                );
            }
            let mut nested = ValidationErrors::new();
            for validator in &self.validators {
                validator.validate(definition, &mut nested, principal);
            }
            errors.absorb_nested(name, nested);
        }
        errors.into_result()?;
        info!(count = definitions.len(), principal = %principal.name(), "Saving account batch");
        self.store.save_all(definitions, Some(principal.name())).await
    }

    pub async fn delete(&self, name: &str, principal: &Principal) -> Result<()> {
        if self.should_deny_write(principal, name).await? {
            return Err(CredplaneError::unauthorized(format!(
                "Unauthorized to delete account '{}'",
                name
            )));
        }
        info!(name, principal = %principal.name(), "Deleting account");
        self.store.delete(name, Some(principal.name())).await
    }

    /// Delete a batch.
    ///
    /// Authorization and existence are checked for every name before any
    /// deletion happens; the deletions themselves are per-entry.
    pub async fn delete_all(&self, names: &[String], principal: &Principal) -> Result<()> {
        let mut unauthorized = Vec::new();
        for name in names {
            if self.should_deny_write(principal, name).await? {
                unauthorized.push(name.clone());
            }
        }
        if !unauthorized.is_empty() {
            return Err(CredplaneError::unauthorized(format!(
                "Unauthorized to delete account(s): {}",
                unauthorized.join(", ")
            )));
        }
        let unknown = self.store.unknown_names(names).await?;
        if !unknown.is_empty() {
            let mut unknown: Vec<String> = unknown.into_iter().collect();
            unknown.sort();
            return Err(CredplaneError::not_found("credentials definitions", unknown.join(", ")));
        }
        info!(count = names.len(), principal = %principal.name(), "Deleting account batch");
        self.store.delete_all(names, Some(principal.name())).await
    }

    /// Revision history for a name, newest first
    pub async fn revision_history(&self, name: &str) -> Result<Vec<Revision>> {
        self.store.revision_history(name).await
    }
}
