//! Composite definition source: storage merged with static configuration.

use crate::domain::{CredentialsDefinition, CredentialsSource, CredentialsView};
use crate::errors::Result;
use crate::sources::CredentialsDefinitionSource;
use crate::storage::CredentialsDefinitionStore;
use async_trait::async_trait;
use dashmap::DashSet;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Merges the persistent store with zero or more static sources of one
/// credential type into a single logical source.
///
/// Storage-backed definitions take precedence: merge order is storage first,
/// then each static source in list order, keeping only the first occurrence
/// of each name. A duplicate name is logged once when first seen; the warned
/// set is pruned to names still duplicated on each merge, so a duplicate
/// that disappears and later returns warns again.
pub struct CompositeCredentialsDefinitionSource {
    store: Arc<dyn CredentialsDefinitionStore>,
    type_name: String,
    config_sources: Vec<Arc<dyn CredentialsDefinitionSource>>,
    // names already reported as duplicates, to avoid spamming the logs
    warned_duplicates: DashSet<String>,
}

impl CompositeCredentialsDefinitionSource {
    pub fn new<T: Into<String>>(
        store: Arc<dyn CredentialsDefinitionStore>,
        type_name: T,
        config_sources: Vec<Arc<dyn CredentialsDefinitionSource>>,
    ) -> Self {
        Self {
            store,
            type_name: type_name.into(),
            config_sources,
            warned_duplicates: DashSet::new(),
        }
    }

    /// Credential type served by this source
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Lists all views into credentials of this type: storage-backed views as
    /// reported by the store, then config-sourced views built fresh.
    ///
    /// Views are for display and are intentionally *not* de-duplicated; the
    /// authoritative de-duplicated list is [`credentials_definitions`].
    ///
    /// [`credentials_definitions`]: CredentialsDefinitionSource::credentials_definitions
    pub async fn list_credentials_views(&self) -> Result<Vec<CredentialsView>> {
        let mut views = self.store.list_credentials_views(&self.type_name).await?;
        for source in &self.config_sources {
            for definition in source.credentials_definitions().await? {
                views.push(CredentialsView::of(&definition, CredentialsSource::Config));
            }
        }
        Ok(views)
    }
}

#[async_trait]
impl CredentialsDefinitionSource for CompositeCredentialsDefinitionSource {
    async fn credentials_definitions(&self) -> Result<Vec<CredentialsDefinition>> {
        let mut candidates = self.store.list_by_type(&self.type_name).await?;
        for source in &self.config_sources {
            candidates.extend(source.credentials_definitions().await?);
        }

        let mut seen = HashSet::new();
        let mut duplicates = HashSet::new();
        let mut merged = Vec::with_capacity(candidates.len());
        for definition in candidates {
            if seen.insert(definition.name.clone()) {
                merged.push(definition);
            } else {
                if self.warned_duplicates.insert(definition.name.clone()) {
                    warn!(
                        name = %definition.name,
                        credential_type = %self.type_name,
                        "Duplicate account name detected; skipping this definition"
                    );
                }
                duplicates.insert(definition.name);
            }
        }
        // prune so a duplicate that goes away and later returns warns again
        self.warned_duplicates.retain(|name| duplicates.contains(name));
        Ok(merged)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CredentialsDefinition>> {
        if let Some(definition) = self.store.find_by_name(name).await? {
            return Ok(Some(definition));
        }
        for source in &self.config_sources {
            if let Some(definition) = source.find_by_name(name).await? {
                return Ok(Some(definition));
            }
        }
        Ok(None)
    }
}
