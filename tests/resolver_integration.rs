//! Integration tests for secret resolution against a CSV secrets file
//!
//! Every test writes its own secrets file into a temporary directory and uses
//! a unique override prefix, so tests only share the process environment.

use secretary::secrets::{
    secret_map, CategoryRewriter, EnvSecretBackend, FileSecretBackend, MergePolicy, OverrideLayer,
    ResolverOptions, RewriteRule, SecretBackend, SecretResolver, SecretsError,
};
use std::env;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tempfile::TempDir;

// Serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn env_lock() -> MutexGuard<'static, ()> {
    ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

const SECRETS_CSV: &str = "\
name,category,value,notes
example_name,root,super_secret,example secret
example_pw,prod/data,super_secret_pw,production password
example_user,prod/data,prod_user,
example_pw,test/data,test_pw,
example_user,test/data,test_user,
example_pw,alt,alt_pw,alternative password
";

struct Fixture {
    _dir: TempDir,
    path: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.csv");
        std::fs::write(&path, SECRETS_CSV).unwrap();
        Self { _dir: dir, path }
    }

    fn backend(&self) -> Arc<dyn SecretBackend> {
        Arc::new(FileSecretBackend::new(&self.path))
    }

    fn resolver(&self, prefix: &str) -> SecretResolver {
        self.resolver_with(ResolverOptions::default().with_overrides(OverrideLayer::new(prefix)))
    }

    fn resolver_with(&self, options: ResolverOptions) -> SecretResolver {
        SecretResolver::new(vec![self.backend()], options).unwrap()
    }
}

#[tokio::test]
async fn test_root_category_is_default() {
    let fixture = Fixture::new();
    let resolver = fixture.resolver("ITEST_ROOT");

    let value = resolver.get_secret("example_name", None).await.unwrap();
    assert_eq!(value.expose_secret(), "super_secret");

    let explicit = resolver.get_secret("example_name", Some("root")).await.unwrap();
    assert_eq!(explicit, value);
}

#[tokio::test]
async fn test_override_variable_wins_and_is_not_cached() {
    let _guard = env_lock();
    let fixture = Fixture::new();
    let resolver = fixture.resolver("ITEST_OVR");

    env::set_var("ITEST_OVR_ROOT_EXAMPLE_NAME", "other");
    let value = resolver.get_secret("example_name", None).await.unwrap();
    assert_eq!(value.expose_secret(), "other");

    env::remove_var("ITEST_OVR_ROOT_EXAMPLE_NAME");
    let value = resolver.get_secret("example_name", None).await.unwrap();
    assert_eq!(value.expose_secret(), "super_secret");
}

#[tokio::test]
async fn test_override_applies_to_category_dict() {
    let _guard = env_lock();
    let fixture = Fixture::new();
    let resolver = fixture.resolver("ITEST_DICT");

    env::set_var("ITEST_DICT_TEST_DATA_EXAMPLE_USER", "someone_else");
    let secrets = resolver.get_secret_dict(Some("test/data")).await.unwrap();
    env::remove_var("ITEST_DICT_TEST_DATA_EXAMPLE_USER");

    assert_eq!(secrets.len(), 2);
    assert_eq!(secrets["example_pw"].expose_secret(), "test_pw");
    assert_eq!(secrets["example_user"].expose_secret(), "someone_else");
}

#[tokio::test]
async fn test_get_secret_dict_returns_whole_category() {
    let fixture = Fixture::new();
    let resolver = fixture.resolver("ITEST_WHOLE");

    let secrets = resolver.get_secret_dict(Some("test/data")).await.unwrap();
    assert_eq!(
        secrets,
        secret_map([("example_pw", "test_pw"), ("example_user", "test_user")])
    );

    let empty = resolver.get_secret_dict(Some("missing/category")).await.unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn test_category_rewrite_redirects_prod_to_test() {
    let fixture = Fixture::new();
    let rewriter = CategoryRewriter::new(Some(RewriteRule::new("^prod/", "test/").unwrap()));
    let resolver = fixture.resolver_with(
        ResolverOptions::default()
            .with_rewriter(rewriter)
            .with_overrides(OverrideLayer::new("ITEST_REWRITE")),
    );

    let value = resolver.get_secret("example_pw", Some("prod/data")).await.unwrap();
    assert_eq!(value.expose_secret(), "test_pw");

    let secrets = resolver.get_secret_dict(Some("prod/data")).await.unwrap();
    assert_eq!(secrets["example_user"].expose_secret(), "test_user");

    // Categories the pattern does not match pass through
    let value = resolver.get_secret("example_pw", Some("alt")).await.unwrap();
    assert_eq!(value.expose_secret(), "alt_pw");
}

#[tokio::test]
async fn test_store_round_trip_survives_new_resolver() {
    let fixture = Fixture::new();
    let resolver = fixture.resolver("ITEST_STORE");

    assert_eq!(
        resolver.get_secret("example_pw", Some("alt")).await.unwrap().expose_secret(),
        "alt_pw"
    );

    resolver
        .store_secrets(&secret_map([("example_pw", "foobar")]), Some("alt"))
        .await
        .unwrap();
    assert_eq!(
        resolver.get_secret("example_pw", Some("alt")).await.unwrap().expose_secret(),
        "foobar"
    );

    // A fresh resolver has an empty cache and must read the file
    let fresh = fixture.resolver("ITEST_STORE");
    assert_eq!(fresh.get_secret("example_pw", Some("alt")).await.unwrap().expose_secret(), "foobar");

    // Other rows are untouched
    assert_eq!(
        fresh.get_secret("example_pw", Some("test/data")).await.unwrap().expose_secret(),
        "test_pw"
    );
}

#[tokio::test]
async fn test_cache_serves_values_until_forgotten() {
    let fixture = Fixture::new();
    let resolver = fixture.resolver("ITEST_CACHE");

    let first = resolver.get_secret("example_name", None).await.unwrap();
    assert_eq!(first.expose_secret(), "super_secret");

    // Change the file behind the resolver's back
    std::fs::write(&fixture.path, "name,category,value\nexample_name,root,rotated\n").unwrap();
    assert_eq!(resolver.get_secret("example_name", None).await.unwrap(), first);

    resolver.forget_secrets().await;
    assert_eq!(
        resolver.get_secret("example_name", None).await.unwrap().expose_secret(),
        "rotated"
    );
}

#[tokio::test]
async fn test_missing_secret_is_not_found() {
    let fixture = Fixture::new();
    let resolver = fixture.resolver("ITEST_MISSING");

    let err = resolver.get_secret("nope", Some("test/data")).await.unwrap_err();
    assert!(err.is_not_found());
    match err {
        SecretsError::NotFound { name, category } => {
            assert_eq!(name, "nope");
            assert_eq!(category, "test/data");
        }
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_file_is_backend_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let backend: Arc<dyn SecretBackend> =
        Arc::new(FileSecretBackend::new(dir.path().join("absent.csv")));
    let resolver = SecretResolver::new(
        vec![backend],
        ResolverOptions::default().with_overrides(OverrideLayer::disabled()),
    )
    .unwrap();

    let err = resolver.get_secret("example_name", None).await.unwrap_err();
    match err {
        SecretsError::BackendUnavailable { backend, message } => {
            assert_eq!(backend, "file");
            assert!(message.contains("absent.csv"));
        }
        other => panic!("expected BackendUnavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_env_backend_layered_over_file() {
    let _guard = env_lock();
    let fixture = Fixture::new();
    let env_backend: Arc<dyn SecretBackend> = Arc::new(EnvSecretBackend::new("ITEST_LAYER").unwrap());

    env::set_var("ITEST_LAYER_ROOT_EXAMPLE_NAME", "from_env");

    let last_wins = SecretResolver::new(
        vec![fixture.backend(), env_backend.clone()],
        ResolverOptions::default().with_overrides(OverrideLayer::disabled()),
    )
    .unwrap();
    assert_eq!(last_wins.source_id(), "file+env");
    assert_eq!(
        last_wins.get_secret("example_name", None).await.unwrap().expose_secret(),
        "from_env"
    );

    let first_match = SecretResolver::new(
        vec![fixture.backend(), env_backend],
        ResolverOptions::default()
            .with_overrides(OverrideLayer::disabled())
            .with_merge_policy(MergePolicy::FirstMatch),
    )
    .unwrap();
    assert_eq!(
        first_match.get_secret("example_name", None).await.unwrap().expose_secret(),
        "super_secret"
    );

    env::remove_var("ITEST_LAYER_ROOT_EXAMPLE_NAME");

    // With LastWins the env backend is the store target and is read-only
    let err = last_wins
        .store_secrets(&secret_map([("example_pw", "x")]), Some("alt"))
        .await
        .unwrap_err();
    assert!(matches!(err, SecretsError::NotWritable { ref backend } if backend == "env"));
}

#[tokio::test]
async fn test_setup_env_from_secrets_exports_category() {
    let _guard = env_lock();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("secrets.csv");
    std::fs::write(
        &path,
        "name,category,value\nITEST_DB_USER,db,admin\nITEST_DB_PASS,db,hunter2\nbad=name,db,x\n",
    )
    .unwrap();
    let resolver = SecretResolver::new(
        vec![Arc::new(FileSecretBackend::new(&path))],
        ResolverOptions::default().with_overrides(OverrideLayer::disabled()),
    )
    .unwrap();

    env::set_var("ITEST_DB_USER", "already_set");
    let exported = resolver.setup_env_from_secrets(Some("db"), false).await.unwrap();
    assert_eq!(exported, vec!["ITEST_DB_PASS".to_string()]);
    assert_eq!(env::var("ITEST_DB_USER").unwrap(), "already_set");
    assert_eq!(env::var("ITEST_DB_PASS").unwrap(), "hunter2");

    let exported = resolver.setup_env_from_secrets(Some("db"), true).await.unwrap();
    assert_eq!(exported.len(), 2);
    assert_eq!(env::var("ITEST_DB_USER").unwrap(), "admin");

    env::remove_var("ITEST_DB_USER");
    env::remove_var("ITEST_DB_PASS");
}

#[tokio::test]
async fn test_env_backend_dict_agrees_with_get_secret() {
    let _guard = env_lock();
    let fixture = Fixture::new();
    let env_backend: Arc<dyn SecretBackend> = Arc::new(EnvSecretBackend::new("ITEST_ENVDICT").unwrap());
    env::set_var("ITEST_ENVDICT_PROD_DATA_EXAMPLE_PW", "env_pw");
    env::set_var("ITEST_ENVDICT_PROD_DATA_DB_HOST", "db.internal");

    // Multi-segment category served by the env backend alone
    let env_only = SecretResolver::new(
        vec![env_backend.clone()],
        ResolverOptions::default().with_overrides(OverrideLayer::disabled()),
    )
    .unwrap();
    assert_eq!(env_only.get_secret("db_host", Some("prod/data")).await.unwrap().expose_secret(), "db.internal");
    let secrets = env_only.get_secret_dict(Some("prod/data")).await.unwrap();
    assert_eq!(secrets, secret_map([("DB_HOST", "db.internal"), ("EXAMPLE_PW", "env_pw")]));

    // Layered over the file, the env value replaces the file value under the file's name
    let layered = SecretResolver::new(
        vec![fixture.backend(), env_backend],
        ResolverOptions::default().with_overrides(OverrideLayer::disabled()),
    )
    .unwrap();
    let secrets = layered.get_secret_dict(Some("prod/data")).await.unwrap();
    env::remove_var("ITEST_ENVDICT_PROD_DATA_EXAMPLE_PW");
    env::remove_var("ITEST_ENVDICT_PROD_DATA_DB_HOST");

    assert_eq!(
        secrets,
        secret_map([("DB_HOST", "db.internal"), ("example_pw", "env_pw"), ("example_user", "prod_user")])
    );
}

#[tokio::test]
async fn test_store_over_duplicate_rows_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("secrets.csv");
    std::fs::write(&path, "category,name,value\nalt,pw,old1\nalt,pw,old2\n").unwrap();
    let resolver = || {
        SecretResolver::new(
            vec![Arc::new(FileSecretBackend::new(&path))],
            ResolverOptions::default().with_overrides(OverrideLayer::disabled()),
        )
        .unwrap()
    };

    resolver().store_secrets(&secret_map([("pw", "new")]), Some("alt")).await.unwrap();
    assert_eq!(resolver().get_secret("pw", Some("alt")).await.unwrap().expose_secret(), "new");
    assert_eq!(resolver().get_secret_dict(Some("alt")).await.unwrap(), secret_map([("pw", "new")]));
}
