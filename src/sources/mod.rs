//! Credential definition sources.
//!
//! A source produces the current full definition set on demand — never a
//! diff. Static sources serve a fixed list from configuration; the composite
//! source merges the persistent store with any number of static sources into
//! one de-duplicated view per credential type.

pub mod composite;
pub mod config;

pub use composite::CompositeCredentialsDefinitionSource;
pub use config::StaticCredentialsSource;

use crate::domain::CredentialsDefinition;
use crate::errors::Result;
use async_trait::async_trait;

/// Produces the current full set of credential definitions.
///
/// Pulls are idempotent: two consecutive calls against an unchanged backing
/// source return structurally equal sets. A failed pull is fatal to the
/// calling load cycle and retried by the embedding scheduler.
#[async_trait]
pub trait CredentialsDefinitionSource: Send + Sync {
    /// Pull the current full definition set
    async fn credentials_definitions(&self) -> Result<Vec<CredentialsDefinition>>;

    /// Find a definition by name.
    ///
    /// The default is a linear scan over the full set — correct but O(n);
    /// implementations with indexed backing stores should override it.
    async fn find_by_name(&self, name: &str) -> Result<Option<CredentialsDefinition>> {
        Ok(self
            .credentials_definitions()
            .await?
            .into_iter()
            .find(|definition| definition.name() == name))
    }
}
