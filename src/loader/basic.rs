//! The diff-based credentials loader.

use crate::domain::{Credentials, CredentialsDefinition};
use crate::errors::Result;
use crate::loader::CredentialsParser;
use crate::observability::metric;
use crate::repository::CredentialsRepository;
use crate::sources::CredentialsDefinitionSource;
use dashmap::DashMap;
use futures::future::join_all;
use metrics::counter;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Loads the full definition set from a source and applies the deltas to the
/// live repository.
///
/// State: a map from definition name to the last successfully applied
/// definition, used to detect changes before paying for a parse. A definition
/// is recorded there the moment its parse succeeds — before the apply
/// completes — so a concurrent reload arriving mid-apply does not re-stage
/// the same change. `load()` calls are serialized internally; the diff state
/// is not safe for concurrent mutation by two overlapping loads.
pub struct CredentialsLoader<C: Credentials> {
    type_name: String,
    source: Arc<dyn CredentialsDefinitionSource>,
    parser: Arc<dyn CredentialsParser<C>>,
    repository: Arc<CredentialsRepository<C>>,
    parallel: bool,
    loaded_definitions: DashMap<String, CredentialsDefinition>,
    load_lock: tokio::sync::Mutex<()>,
}

impl<C: Credentials> CredentialsLoader<C> {
    pub fn new<T: Into<String>>(
        type_name: T,
        source: Arc<dyn CredentialsDefinitionSource>,
        parser: Arc<dyn CredentialsParser<C>>,
        repository: Arc<CredentialsRepository<C>>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            source,
            parser,
            repository,
            parallel: false,
            loaded_definitions: DashMap::new(),
            load_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Apply staged credentials concurrently instead of sequentially.
    ///
    /// There is no ordering guarantee between entries applied this way.
    /// Only appropriate when parsing/apply is side-effect free across
    /// entries, e.g. independent network calls per account.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Credential type served by this loader
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The repository this loader populates
    pub fn repository(&self) -> &Arc<CredentialsRepository<C>> {
        &self.repository
    }

    /// Pull the full definition set and reconcile the live repository.
    ///
    /// A failed source pull is fatal to this invocation and left to the
    /// embedding scheduler to retry. Per-definition parse failures are
    /// isolated: counted, logged, and neither applied nor recorded, so they
    /// are retried on the next load.
    pub async fn load(&self) -> Result<()> {
        let _serialized = self.load_lock.lock().await;
        let definitions = self.source.credentials_definitions().await?;
        self.reconcile(definitions).await;
        Ok(())
    }

    async fn reconcile(&self, definitions: Vec<CredentialsDefinition>) {
        let definition_names: HashSet<&str> =
            definitions.iter().map(|definition| definition.name()).collect();

        // Tear down anything no longer reported by the source
        let mut removed = 0usize;
        for credentials in self.repository.get_all() {
            let name = credentials.name();
            if !definition_names.contains(name) {
                self.loaded_definitions.remove(name);
                self.repository.delete(name);
                removed += 1;
            }
        }

        // Re-parse only new or structurally changed definitions
        let mut staged = Vec::new();
        let mut failures = 0usize;
        for definition in definitions {
            let changed = match self.loaded_definitions.get(definition.name()) {
                None => true,
                Some(previous) => previous.value() != &definition,
            };
            if !changed {
                continue;
            }
            match self.parser.parse(&definition).await {
                Ok(Some(credentials)) => {
                    // Record before the apply completes so a reload arriving
                    // mid-apply does not re-stage this change
                    self.loaded_definitions
                        .insert(definition.name().to_string(), definition);
                    staged.push(credentials);
                }
                Ok(None) => {
                    debug!(
                        name = %definition.name(),
                        credential_type = %self.type_name,
                        "Parser skipped definition"
                    );
                }
                Err(error) => {
                    failures += 1;
                    counter!(metric::PARSE_FAILURES, "credential_type" => self.type_name.clone())
                        .increment(1);
                    warn!(
                        name = %definition.name(),
                        credential_type = %self.type_name,
                        %error,
                        "Failed to parse credentials definition; will retry on next load"
                    );
                }
            }
        }

        let applied = staged.len();
        if self.parallel {
            let handles: Vec<_> = staged
                .into_iter()
                .map(|credentials| {
                    let repository = self.repository.clone();
                    tokio::spawn(async move { repository.save(credentials) })
                })
                .collect();
            for handle in join_all(handles).await {
                if let Err(error) = handle {
                    warn!(%error, "Parallel credentials apply task panicked");
                }
            }
        } else {
            for credentials in staged {
                self.repository.save(credentials);
            }
        }

        counter!(metric::APPLIED, "credential_type" => self.type_name.clone())
            .increment(applied as u64);
        if applied > 0 || removed > 0 || failures > 0 {
            info!(
                credential_type = %self.type_name,
                applied,
                removed,
                failures,
                "Reconciled credentials"
            );
        }
    }

    /// Apply a single changed definition without a full reload
    pub async fn on_definition_changed(&self, definition: &CredentialsDefinition) -> Result<()> {
        if let Some(credentials) = self.parser.parse(definition).await? {
            self.loaded_definitions
                .insert(definition.name().to_string(), definition.clone());
            self.repository.save(credentials);
        }
        Ok(())
    }

    /// Tear down a single removed definition without a full reload
    pub fn on_definition_removed(&self, name: &str) {
        self.loaded_definitions.remove(name);
        self.repository.delete(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CredplaneError;
    use crate::repository::CredentialsLifecycleHandler;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct TestCredentials {
        name: String,
        credentials_name: String,
    }

    impl Credentials for TestCredentials {
        fn name(&self) -> &str {
            &self.name
        }

        fn type_name(&self) -> &str {
            "test"
        }
    }

    /// Source whose definition set can be swapped between loads
    #[derive(Default)]
    struct MutableSource {
        definitions: Mutex<Vec<CredentialsDefinition>>,
    }

    impl MutableSource {
        fn set(&self, definitions: Vec<CredentialsDefinition>) {
            *self.definitions.lock().unwrap() = definitions;
        }
    }

    #[async_trait]
    impl CredentialsDefinitionSource for MutableSource {
        async fn credentials_definitions(&self) -> Result<Vec<CredentialsDefinition>> {
            Ok(self.definitions.lock().unwrap().clone())
        }
    }

    /// Parser that counts invocations and doubles the name into
    /// `credentials_name`
    #[derive(Default)]
    struct CountingParser {
        parses: AtomicUsize,
        fail_names: Mutex<HashSet<String>>,
    }

    impl CountingParser {
        fn parse_count(&self) -> usize {
            self.parses.load(Ordering::SeqCst)
        }

        fn fail_for(&self, name: &str) {
            self.fail_names.lock().unwrap().insert(name.to_string());
        }

        fn heal(&self, name: &str) {
            self.fail_names.lock().unwrap().remove(name);
        }
    }

    #[async_trait]
    impl CredentialsParser<TestCredentials> for CountingParser {
        async fn parse(
            &self,
            definition: &CredentialsDefinition,
        ) -> Result<Option<TestCredentials>> {
            self.parses.fetch_add(1, Ordering::SeqCst);
            if self.fail_names.lock().unwrap().contains(definition.name()) {
                return Err(CredplaneError::internal("parser exploded"));
            }
            Ok(Some(TestCredentials {
                name: definition.name().to_string(),
                credentials_name: format!("{}{}", definition.name(), definition.name()),
            }))
        }
    }

    #[derive(Default)]
    struct EventLog {
        events: Mutex<Vec<String>>,
    }

    impl CredentialsLifecycleHandler<TestCredentials> for EventLog {
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

    struct Fixture {
        source: Arc<MutableSource>,
        parser: Arc<CountingParser>,
        events: Arc<EventLog>,
        loader: CredentialsLoader<TestCredentials>,
    }

    fn fixture() -> Fixture {
        let source = Arc::new(MutableSource::default());
        let parser = Arc::new(CountingParser::default());
        let events = Arc::new(EventLog::default());
        let repository =
            Arc::new(CredentialsRepository::with_handler("test", events.clone()));
        let loader = CredentialsLoader::new(
            "test",
            source.clone() as Arc<dyn CredentialsDefinitionSource>,
            parser.clone() as Arc<dyn CredentialsParser<TestCredentials>>,
            repository,
        );
        Fixture { source, parser, events, loader }
    }

    fn definition(name: &str, account_id: &str) -> CredentialsDefinition {
        CredentialsDefinition::new(name, "test").with_field("accountId", account_id)
    }

    #[tokio::test]
    async fn test_idempotent_load() {
        let f = fixture();
        f.source.set(vec![definition("a", "1"), definition("b", "1")]);

        f.loader.load().await.unwrap();
        assert_eq!(f.parser.parse_count(), 2);
        assert_eq!(f.events.events.lock().unwrap().len(), 2);

        // unchanged source: zero parses, zero repository mutations
        f.loader.load().await.unwrap();
        assert_eq!(f.parser.parse_count(), 2);
        assert_eq!(f.events.events.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_change_isolation() {
        let f = fixture();
        f.source.set(vec![definition("a", "1"), definition("b", "1")]);
        f.loader.load().await.unwrap();

        // A changes, B stays: only A is re-parsed, no event for B
        f.source.set(vec![definition("a", "2"), definition("b", "1")]);
        f.loader.load().await.unwrap();
        assert_eq!(f.parser.parse_count(), 3);
        let events = f.events.events.lock().unwrap();
        assert_eq!(events.iter().filter(|e| *e == "updated:a").count(), 1);
        assert!(!events.iter().any(|e| *e == "updated:b"));
    }

    #[tokio::test]
    async fn test_garbage_collection_and_readd() {
        let f = fixture();
        f.source.set(vec![definition("a", "1"), definition("b", "1")]);
        f.loader.load().await.unwrap();

        f.source.set(vec![definition("b", "1")]);
        f.loader.load().await.unwrap();
        assert!(!f.loader.repository().has("a"));
        assert!(f.loader.repository().has("b"));
        assert!(f.events.events.lock().unwrap().contains(&"deleted:a".to_string()));

        // A comes back: re-added as new, not treated as unchanged
        f.source.set(vec![definition("a", "1"), definition("b", "1")]);
        f.loader.load().await.unwrap();
        assert!(f.loader.repository().has("a"));
        let events = f.events.events.lock().unwrap();
        assert_eq!(events.iter().filter(|e| **e == "added:a".to_string()).count(), 2);
    }

    #[tokio::test]
    async fn test_parse_failure_is_isolated_and_retried() {
        let f = fixture();
        f.parser.fail_for("bad");
        f.source.set(vec![definition("good", "1"), definition("bad", "1")]);

        f.loader.load().await.unwrap();
        assert!(f.loader.repository().has("good"));
        assert!(!f.loader.repository().has("bad"));

        // failure was not recorded as loaded, so the next cycle retries it
        f.parser.heal("bad");
        f.loader.load().await.unwrap();
        assert!(f.loader.repository().has("bad"));
    }

    #[tokio::test]
    async fn test_parser_scenario_doubles_name() {
        let f = fixture();
        f.source.set(vec![definition("acct1", "1"), definition("acct2", "1")]);
        f.loader.load().await.unwrap();

        let all = f.loader.repository().get_all();
        assert_eq!(all.len(), 2);
        let mut names: Vec<&str> = all.iter().map(|c| c.name()).collect();
        names.sort();
        assert_eq!(names, vec!["acct1", "acct2"]);
        let acct1 = f.loader.repository().get_one("acct1").unwrap();
        assert_eq!(acct1.credentials_name, "acct1acct1");
    }

    #[tokio::test]
    async fn test_parallel_apply() {
        let f = fixture();
        let loader = f.loader.parallel(true);
        f.source.set((0..16).map(|i| definition(&format!("acct{}", i), "1")).collect());
        loader.load().await.unwrap();
        assert_eq!(loader.repository().get_all().len(), 16);
    }

    #[tokio::test]
    async fn test_definition_change_listener() {
        let f = fixture();
        f.loader.on_definition_changed(&definition("a", "1")).await.unwrap();
        assert!(f.loader.repository().has("a"));

        f.loader.on_definition_removed("a");
        assert!(!f.loader.repository().has("a"));

        // removal also forgot the diff state: the same definition re-parses
        f.loader.on_definition_changed(&definition("a", "1")).await.unwrap();
        assert_eq!(f.parser.parse_count(), 2);
    }

    #[tokio::test]
    async fn test_source_failure_is_fatal_to_the_load() {
        struct FailingSource;

        #[async_trait]
        impl CredentialsDefinitionSource for FailingSource {
            async fn credentials_definitions(&self) -> Result<Vec<CredentialsDefinition>> {
                Err(CredplaneError::source("backing store unreachable"))
            }
        }

        let repository = Arc::new(CredentialsRepository::new("test"));
        let loader = CredentialsLoader::new(
            "test",
            Arc::new(FailingSource) as Arc<dyn CredentialsDefinitionSource>,
            Arc::new(CountingParser::default()) as Arc<dyn CredentialsParser<TestCredentials>>,
            repository,
        );
        assert!(matches!(loader.load().await, Err(CredplaneError::Source { .. })));
    }
}
