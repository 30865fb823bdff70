//! Persistent definition storage contract.
//!
//! The [`CredentialsDefinitionStore`] trait defines CRUD semantics with
//! optimistic concurrency and an append-only revision ledger per definition
//! name. The backing store provides atomicity and isolation for single-name
//! operations; this layer defines only the contract. An in-memory reference
//! implementation backs tests and light deployments — SQL/Redis stores are
//! external implementations of the same trait.

pub mod memory;

pub use memory::InMemoryCredentialsDefinitionStore;

use crate::domain::{CredentialsDefinition, CredentialsView, CredentialsViewMetadata, Revision};
use crate::errors::Result;
use async_trait::async_trait;
use std::collections::HashSet;

/// CRUD persistence operations for credential definitions.
///
/// Every mutating call increments the definition's version by exactly one
/// relative to its immediately preceding revision for that name; versions
/// start at 1 and are never reused, even across delete/recreate cycles — the
/// revision history is a ledger, not a live version field. Mutations take the
/// acting user (when known) so revisions can record who made them.
///
/// Batch operations (`save_all`, `delete_all`) are validated as a unit by the
/// service layer but persisted as independent single-name operations; unless
/// the backing store is explicitly transactional, callers must treat partial
/// batch failure as possible.
#[async_trait]
pub trait CredentialsDefinitionStore: Send + Sync {
    /// Find a stored definition by name
    async fn find_by_name(&self, name: &str) -> Result<Option<CredentialsDefinition>>;

    /// List stored definitions of the given credential type
    async fn list_by_type(&self, type_name: &str) -> Result<Vec<CredentialsDefinition>>;

    /// List views of stored definitions of the given credential type
    async fn list_credentials_views(&self, type_name: &str) -> Result<Vec<CredentialsView>>;

    /// Create a new definition.
    ///
    /// Fails with a conflict if a definition with the same name exists;
    /// never silently overwrites.
    async fn create(
        &self,
        definition: CredentialsDefinition,
        user: Option<&str>,
    ) -> Result<CredentialsViewMetadata>;

    /// Create or replace a definition (upsert)
    async fn save(
        &self,
        definition: CredentialsDefinition,
        user: Option<&str>,
    ) -> Result<CredentialsViewMetadata>;

    /// Upsert definitions in bulk; each entry is persisted independently
    async fn save_all(
        &self,
        definitions: Vec<CredentialsDefinition>,
        user: Option<&str>,
    ) -> Result<Vec<CredentialsView>>;

    /// Replace an existing definition.
    ///
    /// Fails with not-found if no definition with that name exists.
    async fn update(
        &self,
        definition: CredentialsDefinition,
        user: Option<&str>,
    ) -> Result<CredentialsViewMetadata>;

    /// Replace an existing definition only if its current etag is among
    /// `if_match`.
    ///
    /// On precondition mismatch, fails with a precondition-failure carrying
    /// the *current* stored definition so the caller can diff and retry —
    /// distinct from the not-found signal raised when the name is absent.
    async fn update_if_match(
        &self,
        definition: CredentialsDefinition,
        if_match: &[String],
        user: Option<&str>,
    ) -> Result<CredentialsViewMetadata>;

    /// Delete a definition by name; fails with not-found if absent
    async fn delete(&self, name: &str, user: Option<&str>) -> Result<()>;

    /// Delete definitions in bulk; each entry is deleted independently
    async fn delete_all(&self, names: &[String], user: Option<&str>) -> Result<()>;

    /// Revision history for a name, newest first.
    ///
    /// A revision with no definition denotes a deletion at that version.
    /// History survives deletion and re-creation.
    async fn revision_history(&self, name: &str) -> Result<Vec<Revision>>;

    /// The subset of `names` unknown to this store; empty when all are known
    async fn unknown_names(&self, names: &[String]) -> Result<HashSet<String>> {
        let mut unknown = HashSet::new();
        for name in names {
            if self.find_by_name(name).await?.is_none() {
                unknown.insert(name.clone());
            }
        }
        Ok(unknown)
    }
}
