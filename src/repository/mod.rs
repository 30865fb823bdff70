//! Live credentials cache with lifecycle notifications.
//!
//! The repository is the sole read path for the rest of the platform: it is
//! populated exclusively by the loader and queried by every downstream
//! subsystem needing account access. The cache is concurrency-safe because
//! the loader's parallel apply phase mutates it from multiple tasks.

use crate::domain::{Credentials, Permissions};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Receives lifecycle events from a [`CredentialsRepository`].
///
/// A repository has at most one handler; compose multiple listeners behind a
/// single handler externally if needed. Callbacks run synchronously on the
/// applying task and must not block indefinitely.
pub trait CredentialsLifecycleHandler<C: Credentials>: Send + Sync {
    fn credentials_added(&self, _credentials: &C) {}
    fn credentials_updated(&self, _credentials: &C) {}
    fn credentials_deleted(&self, _credentials: &C) {}
}

/// Name-keyed cache of live credentials for one credential type
pub struct CredentialsRepository<C: Credentials> {
    type_name: String,
    credentials: DashMap<String, Arc<C>>,
    handler: Option<Arc<dyn CredentialsLifecycleHandler<C>>>,
}

impl<C: Credentials> CredentialsRepository<C> {
    /// Create a repository with no lifecycle handler
    pub fn new<T: Into<String>>(type_name: T) -> Self {
        Self { type_name: type_name.into(), credentials: DashMap::new(), handler: None }
    }

    /// Create a repository that notifies the given handler
    pub fn with_handler<T: Into<String>>(
        type_name: T,
        handler: Arc<dyn CredentialsLifecycleHandler<C>>,
    ) -> Self {
        Self { type_name: type_name.into(), credentials: DashMap::new(), handler: Some(handler) }
    }

    /// Credential type held by this repository
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Get credentials by name
    pub fn get_one(&self, name: &str) -> Option<Arc<C>> {
        self.credentials.get(name).map(|entry| entry.value().clone())
    }

    /// Whether credentials exist under the given name
    pub fn has(&self, name: &str) -> bool {
        self.credentials.contains_key(name)
    }

    /// Snapshot of all live credentials
    pub fn get_all(&self) -> Vec<Arc<C>> {
        self.credentials.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Insert or replace credentials, firing `credentials_added` for a new
    /// name and `credentials_updated` for an existing one
    pub fn save(&self, credentials: C) {
        let credentials = Arc::new(credentials);
        let name = credentials.name().to_string();
        let previous = self.credentials.insert(name.clone(), credentials.clone());
        debug!(
            name = %name,
            credential_type = %self.type_name,
            updated = previous.is_some(),
            "Stored live credentials"
        );
        if let Some(handler) = &self.handler {
            if previous.is_some() {
                handler.credentials_updated(&credentials);
            } else {
                handler.credentials_added(&credentials);
            }
        }
    }

    /// Remove credentials by name, firing `credentials_deleted` only if an
    /// entry existed
    pub fn delete(&self, name: &str) {
        if let Some((_, removed)) = self.credentials.remove(name) {
            debug!(name, credential_type = %self.type_name, "Removed live credentials");
            if let Some(handler) = &self.handler {
                handler.credentials_deleted(&removed);
            }
        }
    }
}

/// Type-erased read view of a [`CredentialsRepository`].
///
/// The service layer uses this to check name usage and access control across
/// every registered credential type without knowing concrete credentials
/// types.
pub trait AnyCredentialsRepository: Send + Sync {
    fn type_name(&self) -> &str;
    fn has(&self, name: &str) -> bool;
    fn credentials_names(&self) -> Vec<String>;
    /// Access-control metadata of the live credentials under `name`, if the
    /// credentials are access-controlled
    fn permissions_of(&self, name: &str) -> Option<Permissions>;
}

impl<C: Credentials> AnyCredentialsRepository for CredentialsRepository<C> {
    fn type_name(&self) -> &str {
        self.type_name()
    }

    fn has(&self, name: &str) -> bool {
        self.has(name)
    }

    fn credentials_names(&self) -> Vec<String> {
        self.credentials.iter().map(|entry| entry.key().clone()).collect()
    }

    fn permissions_of(&self, name: &str) -> Option<Permissions> {
        self.get_one(name).and_then(|credentials| credentials.permissions().cloned())
    }
}

/// Registry of the live repositories of every credential type
#[derive(Default)]
pub struct CompositeCredentialsRepository {
    repositories: DashMap<String, Arc<dyn AnyCredentialsRepository>>,
}

impl CompositeCredentialsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed repository; replaces any previous repository of the
    /// same type
    pub fn register(&self, repository: Arc<dyn AnyCredentialsRepository>) {
        self.repositories.insert(repository.type_name().to_string(), repository);
    }

    /// Look up the repository for a credential type
    pub fn repository(&self, type_name: &str) -> Option<Arc<dyn AnyCredentialsRepository>> {
        self.repositories.get(type_name).map(|entry| entry.value().clone())
    }

    /// Whether any registered repository holds credentials under `name`
    pub fn has(&self, name: &str) -> bool {
        self.repositories.iter().any(|entry| entry.value().has(name))
    }

    /// Access-control metadata of the first live credentials found under
    /// `name` across all types
    pub fn permissions_of(&self, name: &str) -> Option<Permissions> {
        self.repositories
            .iter()
            .find_map(|entry| entry.value().permissions_of(name))
    }

    /// Registered credential type names
    pub fn type_names(&self) -> Vec<String> {
        self.repositories.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct TestCredentials {
        name: String,
        permissions: Option<Permissions>,
    }

    impl TestCredentials {
        fn new(name: &str) -> Self {
            Self { name: name.into(), permissions: None }
        }

        fn restricted(name: &str, write_role: &str) -> Self {
            Self {
                name: name.into(),
                permissions: Some(Permissions { read: vec![], write: vec![write_role.into()] }),
            }
        }
    }

    impl Credentials for TestCredentials {
        fn name(&self) -> &str {
            &self.name
        }

        fn type_name(&self) -> &str {
            "test"
        }

        fn permissions(&self) -> Option<&Permissions> {
            self.permissions.as_ref()
        }
    }

    #[derive(Default)]
    struct RecordingHandler {
        events: Mutex<Vec<String>>,
    }

    impl CredentialsLifecycleHandler<TestCredentials> for RecordingHandler {
        fn credentials_added(&self, credentials: &TestCredentials) {
            self.events.lock().unwrap().push(format!("added:{}", credentials.name()));
        }

        fn credentials_updated(&self, credentials: &TestCredentials) {
            self.events.lock().unwrap().push(format!("updated:{}", credentials.name()));
        }

        fn credentials_deleted(&self, credentials: &TestCredentials) {
            self.events.lock().unwrap().push(format!("deleted:{}", credentials.name()));
        }
    }

    #[test]
    fn test_save_fires_added_then_updated() {
        let handler = Arc::new(RecordingHandler::default());
        let repository = CredentialsRepository::with_handler("test", handler.clone());

        repository.save(TestCredentials::new("acct1"));
        repository.save(TestCredentials::new("acct1"));
        assert_eq!(
            *handler.events.lock().unwrap(),
            vec!["added:acct1".to_string(), "updated:acct1".to_string()]
        );
    }

    #[test]
    fn test_delete_fires_only_for_existing_entries() {
        let handler = Arc::new(RecordingHandler::default());
        let repository = CredentialsRepository::with_handler("test", handler.clone());

        repository.delete("absent");
        assert!(handler.events.lock().unwrap().is_empty());

        repository.save(TestCredentials::new("acct1"));
        repository.delete("acct1");
        assert_eq!(handler.events.lock().unwrap().last().unwrap(), "deleted:acct1");
        assert!(!repository.has("acct1"));
    }

    #[test]
    fn test_get_all_snapshots_cache() {
        let repository = CredentialsRepository::new("test");
        repository.save(TestCredentials::new("acct1"));
        repository.save(TestCredentials::new("acct2"));
        let mut names: Vec<String> =
            repository.get_all().iter().map(|c| c.name().to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["acct1", "acct2"]);
        assert_eq!(repository.get_one("acct1").unwrap().name(), "acct1");
        assert!(repository.get_one("absent").is_none());
    }

    #[test]
    fn test_composite_spans_types() {
        let test_repo = Arc::new(CredentialsRepository::<TestCredentials>::new("test"));
        test_repo.save(TestCredentials::restricted("acct1", "operators"));

        let composite = CompositeCredentialsRepository::new();
        composite.register(test_repo);

        assert!(composite.has("acct1"));
        assert!(!composite.has("acct2"));
        assert_eq!(
            composite.permissions_of("acct1").unwrap().write,
            vec!["operators".to_string()]
        );
        assert!(composite.permissions_of("acct2").is_none());
        assert_eq!(composite.type_names(), vec!["test".to_string()]);
        assert!(composite.repository("test").is_some());
    }
}
