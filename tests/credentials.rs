//! End-to-end tests across the credentials pipeline: composite source,
//! loader, repository, storage, service, and secret resolution working
//! together the way an embedding service wires them.

use async_trait::async_trait;
use credplane::auth::{
    Authorization, PermissionEvaluator, PermissionTarget, Principal, RolePermissionEvaluator,
};
use credplane::domain::{codes, Credentials, CredentialsDefinition};
use credplane::errors::{CredplaneError, Result};
use credplane::loader::{CredentialsLoader, CredentialsParser};
use credplane::repository::{CompositeCredentialsRepository, CredentialsRepository};
use credplane::secrets::{
    CredentialsSecretManager, DefinitionResolver, SecretEngineRegistry, StaticSecretEngine,
    UserSecret, UserSecretReference,
};
use credplane::service::{
    CredentialsDefinitionService, CredentialsDefinitionValidator, KnownTypeValidator,
    NameValidator, SecretReferenceValidator,
};
use credplane::CredentialsTypeRegistry;
use credplane::sources::{
    CompositeCredentialsDefinitionSource, CredentialsDefinitionSource, StaticCredentialsSource,
};
use credplane::storage::{CredentialsDefinitionStore, InMemoryCredentialsDefinitionStore};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

struct AwsCredentials {
    name: String,
    credentials_name: String,
}

impl Credentials for AwsCredentials {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &str {
        "aws"
    }
}

/// Parser that doubles the account name into `credentials_name`
struct DoublingParser;

#[async_trait]
impl CredentialsParser<AwsCredentials> for DoublingParser {
    async fn parse(&self, definition: &CredentialsDefinition) -> Result<Option<AwsCredentials>> {
        Ok(Some(AwsCredentials {
            name: definition.name().to_string(),
            credentials_name: format!("{}{}", definition.name(), definition.name()),
        }))
    }
}

fn definition(name: &str) -> CredentialsDefinition {
    CredentialsDefinition::new(name, "aws").with_field("accountId", "1")
}

#[tokio::test]
async fn storage_and_config_merge_through_loader() {
    let store = Arc::new(InMemoryCredentialsDefinitionStore::new());
    store
        .save(definition("from-storage").with_field("accountId", "storage"), None)
        .await
        .unwrap();
    // duplicate name in config loses to storage
    let config_source = Arc::new(StaticCredentialsSource::new(vec![
        CredentialsDefinition::new("from-storage", "aws").with_field("accountId", "config"),
        definition("from-config"),
    ]));
    let composite = Arc::new(CompositeCredentialsDefinitionSource::new(
        store.clone(),
        "aws",
        vec![config_source],
    ));

    let repository = Arc::new(CredentialsRepository::new("aws"));
    let loader = CredentialsLoader::new(
        "aws",
        composite as Arc<dyn CredentialsDefinitionSource>,
        Arc::new(DoublingParser) as Arc<dyn CredentialsParser<AwsCredentials>>,
        repository.clone(),
    );

    loader.load().await.unwrap();
    let names: HashSet<String> =
        repository.get_all().iter().map(|c| c.name().to_string()).collect();
    assert_eq!(
        names,
        HashSet::from(["from-storage".to_string(), "from-config".to_string()])
    );

    // deleting the storage copy hands the name over to config on next load
    store.delete("from-storage", None).await.unwrap();
    loader.load().await.unwrap();
    assert!(repository.has("from-storage"));
    assert!(repository.has("from-config"));
}

#[tokio::test]
async fn parser_scenario_two_accounts() {
    let source = Arc::new(StaticCredentialsSource::new(vec![
        definition("acct1"),
        definition("acct2"),
    ]));
    let repository = Arc::new(CredentialsRepository::new("aws"));
    let loader = CredentialsLoader::new(
        "aws",
        source as Arc<dyn CredentialsDefinitionSource>,
        Arc::new(DoublingParser) as Arc<dyn CredentialsParser<AwsCredentials>>,
        repository.clone(),
    );
    loader.load().await.unwrap();

    let all = repository.get_all();
    assert_eq!(all.len(), 2);
    let mut names: Vec<&str> = all.iter().map(|c| c.name()).collect();
    names.sort();
    assert_eq!(names, vec!["acct1", "acct2"]);
    assert_eq!(
        repository.get_one("acct2").unwrap().credentials_name,
        "acct2acct2"
    );
}

#[tokio::test]
async fn optimistic_concurrency_against_service() {
    let store = Arc::new(InMemoryCredentialsDefinitionStore::new());
    let service = CredentialsDefinitionService::new(
        store.clone(),
        Arc::new(RolePermissionEvaluator),
        vec![Arc::new(NameValidator::with_default_pattern())
            as Arc<dyn CredentialsDefinitionValidator>],
        Arc::new(CompositeCredentialsRepository::new()),
    );
    let alice = Principal::new("alice");

    let created = service.create(definition("acct1"), &alice).await.unwrap();
    let error = service
        .update_if_match(
            definition("acct1").with_field("accountId", "2"),
            &["stale-tag".to_string()],
            &alice,
        )
        .await
        .unwrap_err();

    // the failure carries the current stored value, not the incoming one
    let CredplaneError::PreconditionFailed { current, .. } = error else {
        panic!("expected PreconditionFailed");
    };
    assert_eq!(current.string_field("accountId"), Some("1"));

    service
        .update_if_match(
            definition("acct1").with_field("accountId", "2"),
            &[created.etag.unwrap()],
            &alice,
        )
        .await
        .unwrap();

    // revision ledger: create, conditional update
    let history = service.revision_history("acct1").await.unwrap();
    let versions: Vec<u64> = history.iter().map(|r| r.version).collect();
    assert_eq!(versions, vec![2, 1]);
}

#[tokio::test]
async fn revision_ledger_spans_delete_and_recreate() {
    let store = Arc::new(InMemoryCredentialsDefinitionStore::new());
    store.create(definition("acct1"), Some("alice")).await.unwrap();
    store
        .update(definition("acct1").with_field("accountId", "2"), Some("alice"))
        .await
        .unwrap();
    store.delete("acct1", Some("bob")).await.unwrap();
    store.create(definition("acct1"), Some("carol")).await.unwrap();

    let history = store.revision_history("acct1").await.unwrap();
    let versions: Vec<u64> = history.iter().map(|r| r.version).collect();
    assert_eq!(versions, vec![4, 3, 2, 1]);
    assert!(history[1].is_deletion());
    assert!(history[0].account.is_some());
}

/// Evaluator whose secret-READ grants can be revoked mid-test
#[derive(Default)]
struct RevocableEvaluator {
    revoked_secret_read: Mutex<HashSet<String>>,
}

impl RevocableEvaluator {
    fn revoke_secret_read(&self, principal_name: &str) {
        self.revoked_secret_read.lock().unwrap().insert(principal_name.to_string());
    }
}

impl PermissionEvaluator for RevocableEvaluator {
    fn has_permission(
        &self,
        principal: &Principal,
        target: PermissionTarget<'_>,
        _authorization: Authorization,
    ) -> bool {
        if principal.is_admin() {
            return true;
        }
        match target {
            PermissionTarget::UserSecret(_) => {
                !self.revoked_secret_read.lock().unwrap().contains(principal.name())
            }
            _ => true,
        }
    }
}

#[tokio::test]
async fn secret_access_rechecked_at_time_of_use() {
    let mut engines = SecretEngineRegistry::new();
    engines.register(Arc::new(
        StaticSecretEngine::new("vault").with_secret("db", UserSecret::single("hunter2")),
    ));
    let evaluator = Arc::new(RevocableEvaluator::default());
    let manager = Arc::new(CredentialsSecretManager::new(
        Arc::new(engines),
        evaluator.clone() as Arc<dyn PermissionEvaluator>,
    ));

    // resolving a definition field records the (account, reference) pair
    let resolver = DefinitionResolver::new(manager.clone());
    let resolved = resolver
        .resolve(&definition("acct1").with_field("password", "secret://vault?s=db&k=value"))
        .await
        .unwrap();
    assert_eq!(resolved.string_field("password"), Some("hunter2"));

    let alice = Principal::new("alice");
    assert!(manager.can_access_account_with_secrets(&alice, "acct1").await);

    // revoking READ on the secret flips the answer without the definition
    // field ever being re-inspected
    evaluator.revoke_secret_read("alice");
    assert!(!manager.can_access_account_with_secrets(&alice, "acct1").await);

    // admins are exempt from the re-check
    assert!(manager.can_access_account_with_secrets(&Principal::admin("root"), "acct1").await);
}

#[tokio::test]
async fn service_gates_secret_references() {
    let mut engines = SecretEngineRegistry::new();
    engines.register(Arc::new(
        StaticSecretEngine::new("vault").with_secret("db", UserSecret::single("hunter2")),
    ));
    let engines = Arc::new(engines);

    let service = CredentialsDefinitionService::new(
        Arc::new(InMemoryCredentialsDefinitionStore::new()),
        Arc::new(RolePermissionEvaluator),
        vec![
            Arc::new(NameValidator::with_default_pattern())
                as Arc<dyn CredentialsDefinitionValidator>,
            Arc::new(SecretReferenceValidator::new(engines)),
        ],
        Arc::new(CompositeCredentialsRepository::new()),
    );

    // a user secret reference against a registered engine saves fine
    service
        .create(
            definition("acct1").with_field("password", "secret://vault?s=db"),
            &Principal::new("alice"),
        )
        .await
        .unwrap();

    // an external secret reference is admin-only at save time
    let external = definition("acct2").with_field("bootstrap", "encrypted:vault!p:path");
    let error = service.create(external.clone(), &Principal::new("alice")).await.unwrap_err();
    assert_eq!(error.validation_errors()[0].code, codes::EXTERNAL_SECRET_DENIED);
    service.create(external, &Principal::admin("root")).await.unwrap();

    // unknown engines are rejected with a field-scoped error
    let error = service
        .create(
            definition("acct3").with_field("password", "secret://nonexistent?s=db"),
            &Principal::new("alice"),
        )
        .await
        .unwrap_err();
    let errors = error.validation_errors();
    assert_eq!(errors[0].code, codes::UNKNOWN_SECRET_ENGINE);
    assert_eq!(errors[0].field.as_deref(), Some("password"));
}

#[tokio::test]
async fn service_rejects_unregistered_types() {
    let repository = Arc::new(CredentialsRepository::<AwsCredentials>::new("aws"));
    let source = Arc::new(StaticCredentialsSource::new(vec![]));
    let loader = Arc::new(CredentialsLoader::new(
        "aws",
        source as Arc<dyn CredentialsDefinitionSource>,
        Arc::new(DoublingParser) as Arc<dyn CredentialsParser<AwsCredentials>>,
        repository.clone(),
    ));
    let registry = Arc::new(CredentialsTypeRegistry::new());
    registry.register(loader, repository);

    let service = CredentialsDefinitionService::new(
        Arc::new(InMemoryCredentialsDefinitionStore::new()),
        Arc::new(RolePermissionEvaluator),
        vec![
            Arc::new(NameValidator::with_default_pattern())
                as Arc<dyn CredentialsDefinitionValidator>,
            Arc::new(KnownTypeValidator::new(registry.clone())),
        ],
        registry.composite_repository(),
    );
    let alice = Principal::new("alice");

    service.create(definition("acct1"), &alice).await.unwrap();
    let error = service
        .create(CredentialsDefinition::new("acct2", "gcp"), &alice)
        .await
        .unwrap_err();
    assert_eq!(error.validation_errors()[0].code, codes::UNKNOWN_TYPE);
}

#[tokio::test]
async fn loader_resolves_secrets_through_parser() {
    // a parser that resolves secret references before building credentials,
    // the way a real embedding parser would
    struct ResolvingParser {
        resolver: DefinitionResolver,
    }

    #[async_trait]
    impl CredentialsParser<AwsCredentials> for ResolvingParser {
        async fn parse(
            &self,
            definition: &CredentialsDefinition,
        ) -> Result<Option<AwsCredentials>> {
            let resolved = self.resolver.resolve(definition).await?;
            Ok(Some(AwsCredentials {
                name: resolved.name().to_string(),
                credentials_name: resolved
                    .string_field("password")
                    .unwrap_or_default()
                    .to_string(),
            }))
        }
    }

    let mut engines = SecretEngineRegistry::new();
    engines.register(Arc::new(
        StaticSecretEngine::new("vault").with_secret("db", UserSecret::single("hunter2")),
    ));
    let manager = Arc::new(CredentialsSecretManager::new(
        Arc::new(engines),
        Arc::new(RolePermissionEvaluator),
    ));

    let source = Arc::new(StaticCredentialsSource::new(vec![
        definition("acct1").with_field("password", "secret://vault?s=db")
    ]));
    let repository = Arc::new(CredentialsRepository::new("aws"));
    let loader = CredentialsLoader::new(
        "aws",
        source as Arc<dyn CredentialsDefinitionSource>,
        Arc::new(ResolvingParser { resolver: DefinitionResolver::new(manager.clone()) })
            as Arc<dyn CredentialsParser<AwsCredentials>>,
        repository.clone(),
    );
    loader.load().await.unwrap();

    assert_eq!(repository.get_one("acct1").unwrap().credentials_name, "hunter2");
    // the resolution was tracked for time-of-use checks
    let reference = UserSecretReference::parse("secret://vault?s=db").unwrap();
    assert!(manager.tracked_references("acct1").contains(&reference));
}
