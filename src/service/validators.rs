//! Definition validators and the violation collector.

use crate::auth::Principal;
use crate::domain::{codes, CredentialsDefinition, CredentialsError};
use crate::errors::{CredplaneError, Result};
use crate::manager::CredentialsTypeRegistry;
use crate::secrets::{EncryptedSecretReference, SecretEngineRegistry, UserSecretReference};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

/// Default account name pattern, applied when no per-type override exists
pub const DEFAULT_NAME_PATTERN: &str = "^[A-Za-z][-_A-Za-z0-9]+[A-Za-z0-9]$";

static DEFAULT_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_NAME_PATTERN).expect("default name pattern is valid"));

/// Collects field-scoped violations across a validator chain.
///
/// Violations are always collected, never short-circuited, so a caller sees
/// every problem with a definition in one response.
#[derive(Debug, Default)]
pub struct ValidationErrors {
    errors: Vec<CredentialsError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation without field scope
    pub fn reject<C: Into<String>, M: Into<String>>(&mut self, code: C, message: M) {
        self.errors.push(CredentialsError::new(code, message));
    }

    /// Record a field-scoped violation
    pub fn reject_field<F: Into<String>, C: Into<String>, M: Into<String>>(
        &mut self,
        field: F,
        code: C,
        message: M,
    ) {
        self.errors.push(CredentialsError::field(code, message, field));
    }

    /// Absorb another collector's violations, prefixing their field scope
    /// with `path` (used for batch validation)
    pub fn absorb_nested(&mut self, path: &str, nested: ValidationErrors) {
        for mut error in nested.errors {
            error.field = Some(match error.field {
                Some(field) => format!("{}.{}", path, field),
                None => path.to_string(),
            });
            self.errors.push(error);
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[CredentialsError] {
        &self.errors
    }

    /// Convert into a validation failure if any violations were recorded
    pub fn into_result(self) -> Result<()> {
        if self.has_errors() {
            Err(CredplaneError::validation(self.errors))
        } else {
            Ok(())
        }
    }
}

/// One link in the validator chain.
///
/// Implementations record violations instead of returning errors so the
/// whole chain always runs.
pub trait CredentialsDefinitionValidator: Send + Sync {
    fn validate(
        &self,
        definition: &CredentialsDefinition,
        errors: &mut ValidationErrors,
        principal: &Principal,
    );
}

/// Validates account names against a configurable pattern, per credential
/// type or the crate-wide default.
pub struct NameValidator {
    patterns: HashMap<String, Regex>,
}

impl NameValidator {
    /// Validator using only the default pattern
    pub fn with_default_pattern() -> Self {
        Self { patterns: HashMap::new() }
    }

    /// Validator with per-type pattern overrides
    pub fn new(overrides: &HashMap<String, String>) -> Result<Self> {
        let mut patterns = HashMap::new();
        for (type_name, pattern) in overrides {
            let regex = Regex::new(pattern).map_err(|e| {
                CredplaneError::config_with_source(
                    format!("Invalid account name pattern for type '{}'", type_name),
                    Box::new(e),
                )
            })?;
            patterns.insert(type_name.clone(), regex);
        }
        Ok(Self { patterns })
    }

    fn pattern_for(&self, type_name: &str) -> &Regex {
        self.patterns.get(type_name).unwrap_or(&*DEFAULT_NAME_REGEX)
    }
}

impl CredentialsDefinitionValidator for NameValidator {
    fn validate(
        &self,
        definition: &CredentialsDefinition,
        errors: &mut ValidationErrors,
        _principal: &Principal,
    ) {
        let pattern = self.pattern_for(definition.type_name());
        let name = definition.name();
        if !pattern.is_match(name) {
            errors.reject_field(
                "name",
                codes::INVALID_NAME,
                format!(
                    "Provided account name '{}' does not match regular expression {}",
                    name, pattern
                ),
            );
        }
    }
}

/// Validates that a definition's credential type is registered
pub struct KnownTypeValidator {
    registry: Arc<CredentialsTypeRegistry>,
}

impl KnownTypeValidator {
    pub fn new(registry: Arc<CredentialsTypeRegistry>) -> Self {
        Self { registry }
    }
}

impl CredentialsDefinitionValidator for KnownTypeValidator {
    fn validate(
        &self,
        definition: &CredentialsDefinition,
        errors: &mut ValidationErrors,
        _principal: &Principal,
    ) {
        if !self.registry.has_type(definition.type_name()) {
            errors.reject_field(
                "type",
                codes::UNKNOWN_TYPE,
                format!("Unknown credentials type '{}'", definition.type_name()),
            );
        }
    }
}

/// Validates secret references embedded in definition fields.
///
/// User secret references must parse and name a registered engine.
/// External (`encrypted:`) references are additionally admin-only at save
/// time: defining a new external secret is an operator-scoped action,
/// distinct from resolving one already stored, which requires no admin.
pub struct SecretReferenceValidator {
    engines: Arc<SecretEngineRegistry>,
}

impl SecretReferenceValidator {
    pub fn new(engines: Arc<SecretEngineRegistry>) -> Self {
        Self { engines }
    }

    fn check_engine(&self, engine_identifier: &str, field: &str, errors: &mut ValidationErrors) {
        if !self.engines.has_engine(engine_identifier) {
            errors.reject_field(
                field,
                codes::UNKNOWN_SECRET_ENGINE,
                format!("No secret engine registered under '{}'", engine_identifier),
            );
        }
    }
}

impl CredentialsDefinitionValidator for SecretReferenceValidator {
    fn validate(
        &self,
        definition: &CredentialsDefinition,
        errors: &mut ValidationErrors,
        principal: &Principal,
    ) {
        for (field, value) in &definition.spec {
            let field = field.as_str();
            let Some(text) = value.as_str() else { continue };
            if UserSecretReference::is_user_secret(text) {
                match UserSecretReference::parse(text) {
                    Ok(reference) => {
                        self.check_engine(reference.engine_identifier(), field, errors)
                    }
                    Err(error) => errors.reject_field(
                        field,
                        codes::INVALID_SECRET_FORMAT,
                        error.to_string(),
                    ),
                }
            } else if EncryptedSecretReference::is_encrypted_secret(text) {
                if !principal.is_admin() {
                    errors.reject_field(
                        field,
                        codes::EXTERNAL_SECRET_DENIED,
                        "Only administrators may define external secret references",
                    );
                    continue;
                }
                match EncryptedSecretReference::parse(text) {
                    Ok(reference) => {
                        self.check_engine(reference.engine_identifier(), field, errors)
                    }
                    Err(error) => errors.reject_field(
                        field,
                        codes::INVALID_SECRET_FORMAT,
                        error.to_string(),
                    ),
                }
            }
        }
    }
}
