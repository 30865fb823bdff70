//! In-memory reference implementation of the storage contract.

use crate::domain::{
    CredentialsDefinition, CredentialsSource, CredentialsStatus, CredentialsView,
    CredentialsViewMetadata, Revision,
};
use crate::errors::{CredplaneError, Result};
use crate::storage::CredentialsDefinitionStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredDefinition {
    definition: CredentialsDefinition,
    etag: String,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoreState {
    records: HashMap<String, StoredDefinition>,
    // Append-only; survives deletion so versions are never reused
    ledgers: HashMap<String, Vec<Revision>>,
}

impl StoreState {
    fn next_version(&self, name: &str) -> u64 {
        self.ledgers
            .get(name)
            .and_then(|ledger| ledger.last())
            .map(|revision| revision.version + 1)
            .unwrap_or(1)
    }

    fn write(
        &mut self,
        definition: CredentialsDefinition,
        user: Option<&str>,
    ) -> CredentialsViewMetadata {
        let name = definition.name.clone();
        let now = Utc::now();
        let version = self.next_version(&name);
        let etag = Uuid::new_v4().simple().to_string();
        self.ledgers.entry(name.clone()).or_default().push(Revision::of(
            version,
            now,
            definition.clone(),
            user.map(str::to_string),
        ));
        let metadata = CredentialsViewMetadata {
            type_name: definition.type_name.clone(),
            name: name.clone(),
            source: CredentialsSource::Storage,
            etag: Some(etag.clone()),
            last_modified: Some(now),
        };
        self.records
            .insert(name, StoredDefinition { definition, etag, last_modified: now });
        metadata
    }

    fn remove(&mut self, name: &str, user: Option<&str>) -> Result<()> {
        if self.records.remove(name).is_none() {
            return Err(CredplaneError::not_found("credentials definition", name));
        }
        let version = self.next_version(name);
        self.ledgers
            .entry(name.to_string())
            .or_default()
            .push(Revision::deletion(version, Utc::now(), user.map(str::to_string)));
        Ok(())
    }
}

/// Stores definitions in process memory with full revision ledgers.
///
/// Single-name operations are atomic under an internal lock. Batch
/// operations are persisted per-entry, matching the trait contract.
#[derive(Debug, Default)]
pub struct InMemoryCredentialsDefinitionStore {
    state: RwLock<StoreState>,
}

impl InMemoryCredentialsDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn view_of(stored: &StoredDefinition) -> CredentialsView {
        CredentialsView {
            metadata: CredentialsViewMetadata {
                type_name: stored.definition.type_name.clone(),
                name: stored.definition.name.clone(),
                source: CredentialsSource::Storage,
                etag: Some(stored.etag.clone()),
                last_modified: Some(stored.last_modified),
            },
            spec: serde_json::to_value(&stored.definition).unwrap_or(serde_json::Value::Null),
            status: CredentialsStatus::valid(),
        }
    }
}

#[async_trait]
impl CredentialsDefinitionStore for InMemoryCredentialsDefinitionStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<CredentialsDefinition>> {
        let state = self.state.read().expect("store lock poisoned");
        Ok(state.records.get(name).map(|stored| stored.definition.clone()))
    }

    async fn list_by_type(&self, type_name: &str) -> Result<Vec<CredentialsDefinition>> {
        let state = self.state.read().expect("store lock poisoned");
        let mut definitions: Vec<CredentialsDefinition> = state
            .records
            .values()
            .filter(|stored| stored.definition.type_name == type_name)
            .map(|stored| stored.definition.clone())
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(definitions)
    }

    async fn list_credentials_views(&self, type_name: &str) -> Result<Vec<CredentialsView>> {
        let state = self.state.read().expect("store lock poisoned");
        let mut views: Vec<CredentialsView> = state
            .records
            .values()
            .filter(|stored| stored.definition.type_name == type_name)
            .map(Self::view_of)
            .collect();
        views.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
        Ok(views)
    }

    async fn create(
        &self,
        definition: CredentialsDefinition,
        user: Option<&str>,
    ) -> Result<CredentialsViewMetadata> {
        let mut state = self.state.write().expect("store lock poisoned");
        if state.records.contains_key(&definition.name) {
            return Err(CredplaneError::conflict(
                definition.name.clone(),
                "a credentials definition with this name already exists",
            ));
        }
        debug!(name = %definition.name, "Creating credentials definition");
        Ok(state.write(definition, user))
    }

    async fn save(
        &self,
        definition: CredentialsDefinition,
        user: Option<&str>,
    ) -> Result<CredentialsViewMetadata> {
        let mut state = self.state.write().expect("store lock poisoned");
        debug!(name = %definition.name, "Saving credentials definition");
        Ok(state.write(definition, user))
    }

    async fn save_all(
        &self,
        definitions: Vec<CredentialsDefinition>,
        user: Option<&str>,
    ) -> Result<Vec<CredentialsView>> {
        let mut views = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let name = definition.name.clone();
            self.save(definition, user).await?;
            let state = self.state.read().expect("store lock poisoned");
            if let Some(stored) = state.records.get(&name) {
                views.push(Self::view_of(stored));
            }
        }
        Ok(views)
    }

    async fn update(
        &self,
        definition: CredentialsDefinition,
        user: Option<&str>,
    ) -> Result<CredentialsViewMetadata> {
        let mut state = self.state.write().expect("store lock poisoned");
        if !state.records.contains_key(&definition.name) {
            return Err(CredplaneError::not_found("credentials definition", definition.name.as_str()));
        }
        debug!(name = %definition.name, "Updating credentials definition");
        Ok(state.write(definition, user))
    }

    async fn update_if_match(
        &self,
        definition: CredentialsDefinition,
        if_match: &[String],
        user: Option<&str>,
    ) -> Result<CredentialsViewMetadata> {
        let mut state = self.state.write().expect("store lock poisoned");
        let Some(stored) = state.records.get(&definition.name) else {
            return Err(CredplaneError::not_found("credentials definition", definition.name.as_str()));
        };
        if !if_match.contains(&stored.etag) {
            return Err(CredplaneError::PreconditionFailed {
                name: definition.name.clone(),
                etag: stored.etag.clone(),
                current: Box::new(stored.definition.clone()),
            });
        }
        debug!(name = %definition.name, "Conditionally updating credentials definition");
        Ok(state.write(definition, user))
    }

    async fn delete(&self, name: &str, user: Option<&str>) -> Result<()> {
        let mut state = self.state.write().expect("store lock poisoned");
        debug!(name, "Deleting credentials definition");
        state.remove(name, user)
    }

    async fn delete_all(&self, names: &[String], user: Option<&str>) -> Result<()> {
        for name in names {
            self.delete(name, user).await?;
        }
        Ok(())
    }

    async fn revision_history(&self, name: &str) -> Result<Vec<Revision>> {
        let state = self.state.read().expect("store lock poisoned");
        let mut ledger = state.ledgers.get(name).cloned().unwrap_or_default();
        ledger.reverse();
        Ok(ledger)
    }
}
