//! Static, configuration-backed definition source.

use crate::domain::CredentialsDefinition;
use crate::errors::{CredplaneError, Result};
use crate::sources::CredentialsDefinitionSource;
use async_trait::async_trait;
use std::path::Path;

/// Source serving a fixed definition list declared in configuration.
///
/// The list can be built programmatically or loaded from a YAML/JSON document
/// containing a sequence of definitions.
#[derive(Debug)]
pub struct StaticCredentialsSource {
    definitions: Vec<CredentialsDefinition>,
}

impl StaticCredentialsSource {
    pub fn new(definitions: Vec<CredentialsDefinition>) -> Self {
        Self { definitions }
    }

    /// Parse a YAML (or JSON, which YAML subsumes) sequence of definitions
    pub fn from_yaml(document: &str) -> Result<Self> {
        let definitions: Vec<CredentialsDefinition> = serde_yaml::from_str(document)
            .map_err(|e| {
                CredplaneError::config_with_source("Invalid static credentials document", Box::new(e))
            })?;
        Ok(Self::new(definitions))
    }

    /// Load a YAML/JSON definition document from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let document = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CredplaneError::config_with_source(
                format!("Cannot read static credentials file {}", path.as_ref().display()),
                Box::new(e),
            )
        })?;
        Self::from_yaml(&document)
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[async_trait]
impl CredentialsDefinitionSource for StaticCredentialsSource {
    async fn credentials_definitions(&self) -> Result<Vec<CredentialsDefinition>> {
        Ok(self.definitions.clone())
    }
}
