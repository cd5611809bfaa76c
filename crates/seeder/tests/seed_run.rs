//! End-to-end seed runs: SQL seeders discovered from disk, executed through a
//! recording client and tracked in an in-memory history store.

use std::sync::Arc;

use seeder::config::RunSettings;
use seeder::test_support::{RecordingLogger, TestClient};
use seeder::{
    DirectorySource, DiscoveryError, MemoryHistoryStore, RunError, SeedClient, SeedError,
    SeedRunner, SeedRunnerConfig, Seeder, SeederRegistry, SeederStatus, SkipReason, SqlExecutor,
    SqlScriptLoader,
};
use tempfile::TempDir;

fn seeders_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for (name, contents) in files {
        std::fs::write(dir.path().join(name), contents).expect("Failed to write seeder file");
    }
    dir
}

fn settings(environment: &str) -> RunSettings {
    SeedRunnerConfig::default()
        .environment(environment)
        .resolve_with(|_| None)
}

fn runner(client: Arc<TestClient>, environment: &str) -> SeedRunner<Arc<TestClient>> {
    SeedRunner::with_settings(client, settings(environment))
        .with_logger(Arc::new(RecordingLogger::default()))
}

const ROLES: &str = "INSERT INTO roles (name) VALUES ('admin');";
const USERS: &str = "INSERT INTO users (email) VALUES ('admin@example.com');";
const DEMO: &str = "-- environments: development\nINSERT INTO posts (title) VALUES ('demo');";

#[tokio::test]
async fn test_sql_seeders_run_once() {
    let dir = seeders_dir(&[
        ("002_users.sql", USERS),
        ("001_roles.sql", ROLES),
        ("010_demo.sql", DEMO),
    ]);
    let store = Arc::new(MemoryHistoryStore::new());
    let client = Arc::new(TestClient::with_history(store.clone()));
    let runner = runner(client.clone(), "development");
    let source = DirectorySource::new(dir.path(), SqlScriptLoader);

    let first = runner.run_source(&source).await.unwrap();
    assert_eq!(first.executed, 3);
    assert_eq!(
        client.scripts(),
        vec![ROLES.to_string(), USERS.to_string(), DEMO.to_string()]
    );

    let second = runner.run_source(&source).await.unwrap();
    assert_eq!(second.executed, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(client.scripts().len(), 3);

    let names: Vec<_> = store.records().into_iter().map(|r| r.name).collect();
    assert_eq!(names.len(), 3);
    for name in ["001_roles", "002_users", "010_demo"] {
        assert!(names.iter().any(|n| n == name), "missing record for {name}");
    }
}

#[tokio::test]
async fn test_environment_directive_skips_in_production() {
    let dir = seeders_dir(&[("001_roles.sql", ROLES), ("010_demo.sql", DEMO)]);
    let store = Arc::new(MemoryHistoryStore::new());
    let client = Arc::new(TestClient::with_history(store.clone()));
    let runner = runner(client.clone(), "production");

    let summary = runner
        .run_source(&DirectorySource::new(dir.path(), SqlScriptLoader))
        .await
        .unwrap();

    assert_eq!(summary.environment, "production");
    assert_eq!(
        summary.status_of("010_demo"),
        Some(SeederStatus::Skipped(SkipReason::Environment))
    );
    assert_eq!(client.scripts(), vec![ROLES.to_string()]);
    assert!(!store.contains("010_demo"));
}

#[tokio::test]
async fn test_failed_script_aborts_and_resumes() {
    let dir = seeders_dir(&[
        ("001_roles.sql", ROLES),
        ("002_users.sql", USERS),
        ("003_posts.sql", "INSERT INTO posts (title) VALUES ('hello');"),
    ]);
    let store = Arc::new(MemoryHistoryStore::new());
    let source = DirectorySource::new(dir.path(), SqlScriptLoader);

    let failing =
        Arc::new(TestClient::with_history(store.clone()).failing_scripts_containing("users"));
    let err = runner(failing.clone(), "development")
        .run_source(&source)
        .await
        .unwrap_err();

    match err {
        SeedError::Run(RunError::SeederFailed { name, source }) => {
            assert_eq!(name, "002_users");
            assert!(source.to_string().contains("users"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(failing.scripts().len(), 2);
    assert!(store.contains("001_roles"));
    assert!(!store.contains("002_users"));

    let healthy = Arc::new(TestClient::with_history(store.clone()));
    let summary = runner(healthy.clone(), "development")
        .run_source(&source)
        .await
        .unwrap();

    assert_eq!(
        summary.status_of("001_roles"),
        Some(SeederStatus::Skipped(SkipReason::AlreadyApplied))
    );
    assert_eq!(summary.executed, 2);
    assert_eq!(healthy.scripts().len(), 2);
}

#[tokio::test]
async fn test_discovery_failure_runs_nothing() {
    let dir = seeders_dir(&[("001_roles.sql", ROLES), ("002_empty.sql", "-- todo\n")]);
    let client = Arc::new(TestClient::without_history());

    let err = runner(client.clone(), "development")
        .run_source(&DirectorySource::new(dir.path(), SqlScriptLoader))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SeedError::Discovery(DiscoveryError::InvalidSeeder { ref file }) if file == "002_empty.sql"
    ));
    assert!(client.scripts().is_empty());
}

#[tokio::test]
async fn test_code_seeders_use_the_client() {
    let registry = SeederRegistry::<Arc<TestClient>>::new()
        .register(Seeder::from_fn("2_users", |client: &Arc<TestClient>| {
            Box::pin(async move { client.execute_script(USERS).await })
        }))
        .register(Seeder::from_fn("1_roles", |client: &Arc<TestClient>| {
            Box::pin(async move { client.execute_script(ROLES).await })
        }));
    let client = Arc::new(TestClient::without_history());
    let runner = SeedRunner::with_settings(
        client.clone(),
        SeedRunnerConfig::default()
            .track_runs(false)
            .resolve_with(|_| None),
    );

    let summary = runner.run_source(&registry).await.unwrap();

    assert_eq!(summary.executed, 2);
    assert_eq!(client.scripts(), vec![ROLES.to_string(), USERS.to_string()]);
}

#[tokio::test]
async fn test_client_disconnects_after_run() {
    let client = Arc::new(TestClient::without_history());
    let runner = runner(client.clone(), "development");

    runner.run(&[]).await.unwrap();
    runner.into_client().disconnect().await;

    assert!(client.is_disconnected());
}
