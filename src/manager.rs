//! Explicit registry of credential types.
//!
//! Replaces reflective wiring: the embedding service registers each
//! credential type at startup — type name, loader, repository — and every
//! later lookup goes through this registry. The registry also maintains the
//! composite repository view the service layer uses for cross-type checks.

use crate::domain::Credentials;
use crate::errors::Result;
use crate::loader::CredentialsLoader;
use crate::repository::{AnyCredentialsRepository, CompositeCredentialsRepository};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

/// Type-erased handle to a typed [`CredentialsLoader`]
#[async_trait]
pub trait AnyCredentialsLoader: Send + Sync {
    fn type_name(&self) -> &str;
    async fn load(&self) -> Result<()>;
}

#[async_trait]
impl<C: Credentials> AnyCredentialsLoader for CredentialsLoader<C> {
    fn type_name(&self) -> &str {
        self.type_name()
    }

    async fn load(&self) -> Result<()> {
        self.load().await
    }
}

struct RegisteredType {
    loader: Arc<dyn AnyCredentialsLoader>,
    repository: Arc<dyn AnyCredentialsRepository>,
}

/// Registry keyed by credential type name, populated by an explicit startup
/// sequence
#[derive(Default)]
pub struct CredentialsTypeRegistry {
    types: DashMap<String, RegisteredType>,
    composite: Arc<CompositeCredentialsRepository>,
}

impl CredentialsTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a credential type with its loader and repository
    pub fn register<C: Credentials>(
        &self,
        loader: Arc<CredentialsLoader<C>>,
        repository: Arc<crate::repository::CredentialsRepository<C>>,
    ) {
        let type_name = loader.type_name().to_string();
        info!(credential_type = %type_name, "Registering credentials type");
        self.composite.register(repository.clone());
        self.types.insert(
            type_name,
            RegisteredType { loader, repository },
        );
    }

    /// Whether a credential type is registered
    pub fn has_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Registered credential type names
    pub fn type_names(&self) -> Vec<String> {
        self.types.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Loader for a credential type
    pub fn loader(&self, type_name: &str) -> Option<Arc<dyn AnyCredentialsLoader>> {
        self.types.get(type_name).map(|entry| entry.value().loader.clone())
    }

    /// Type-erased repository for a credential type
    pub fn repository(&self, type_name: &str) -> Option<Arc<dyn AnyCredentialsRepository>> {
        self.types.get(type_name).map(|entry| entry.value().repository.clone())
    }

    /// The composite view over every registered repository
    pub fn composite_repository(&self) -> Arc<CompositeCredentialsRepository> {
        self.composite.clone()
    }

    /// Run `load()` for every registered type, in registration-key order.
    ///
    /// The first failure aborts the sweep; per-definition parse failures are
    /// already isolated inside each loader, so an error here means a source
    /// pull failed outright.
    pub async fn load_all(&self) -> Result<()> {
        let loaders: Vec<Arc<dyn AnyCredentialsLoader>> =
            self.types.iter().map(|entry| entry.value().loader.clone()).collect();
        for loader in loaders {
            loader.load().await?;
        }
        Ok(())
    }
}
