//! # Configuration Management
//!
//! Typed configuration for the credentials control plane, loaded from an
//! optional file plus environment variables with the `CREDPLANE_` prefix
//! (nested keys separated by `__`, e.g. `CREDPLANE_OBSERVABILITY__LOG_LEVEL`).

use crate::errors::Result;
use crate::service::DEFAULT_NAME_PATTERN;
use serde::Deserialize;
use std::collections::HashMap;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub credentials: CredentialsConfig,
    pub observability: ObservabilityConfig,
}

/// Credentials loading and validation settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Per-type settings keyed by credential type name
    pub types: HashMap<String, CredentialsTypeSettings>,
    /// Account name pattern applied to types without an override
    pub default_name_pattern: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self { types: HashMap::new(), default_name_pattern: DEFAULT_NAME_PATTERN.to_string() }
    }
}

impl CredentialsConfig {
    /// Settings for a credential type, falling back to defaults
    pub fn type_settings(&self, type_name: &str) -> CredentialsTypeSettings {
        self.types.get(type_name).cloned().unwrap_or_default()
    }

    /// Per-type name pattern overrides, for the name validator
    pub fn name_pattern_overrides(&self) -> HashMap<String, String> {
        self.types
            .iter()
            .filter_map(|(type_name, settings)| {
                settings.name_pattern.clone().map(|pattern| (type_name.clone(), pattern))
            })
            .collect()
    }
}

/// Settings for one credential type
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialsTypeSettings {
    /// Apply staged credentials concurrently during load.
    ///
    /// Only appropriate when parsing/apply is side-effect free across
    /// entries.
    pub parallel: bool,
    /// Whether definitions of this type may be managed through the storage
    /// contract (in addition to static configuration)
    pub storage_enabled: bool,
    /// Account name pattern override for this type
    pub name_pattern: Option<String>,
    /// Static definitions document (YAML/JSON file path) for this type
    pub definitions_file: Option<String>,
}

impl Default for CredentialsTypeSettings {
    fn default() -> Self {
        Self { parallel: false, storage_enabled: true, name_pattern: None, definitions_file: None }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing filter directive (e.g. `info`, `credplane=debug`)
    pub log_level: String,
    /// Emit JSON-formatted logs instead of human-readable ones
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logs: false }
    }
}

impl Config {
    /// Load configuration from the environment, plus the optional file named
    /// by `CREDPLANE_CONFIG_FILE`
    pub fn from_env() -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Ok(path) = std::env::var("CREDPLANE_CONFIG_FILE") {
            builder = builder.add_source(config::File::with_name(&path));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix("CREDPLANE").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
