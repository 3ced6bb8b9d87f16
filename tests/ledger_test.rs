mod common;

use common::{create_test_dir, recording_set, CallLog};
use migrent::{
    read_config, write_config, Context, LedgerStore, LedgerUrl, MigrationError, MigrentConfig,
    Orchestrator, SqliteLedger,
};
use rusqlite::Connection;
use std::sync::Arc;

#[tokio::test]
async fn test_json_ledger_persists_between_runs() {
    let dir = create_test_dir();
    let descriptor = format!("json://{}", dir.path().join("state/ledger.json").display());
    let ctx = Context::background();
    let log = CallLog::new();
    let set = recording_set(&["001_users", "002_roles"], &log);

    let first = migrent::open(&descriptor).await.expect("Should open ledger");
    first.up(&ctx, &set).await.expect("Up should succeed");
    drop(first);

    let second = migrent::open(&descriptor).await.expect("Should reopen ledger");
    second.up(&ctx, &set).await.expect("Up should succeed");

    assert_eq!(log.entries(), vec!["up:001_users", "up:002_roles"]);
    let names: Vec<String> = second
        .applied(&ctx)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name.to_string())
        .collect();
    assert_eq!(names, vec!["001_users", "002_roles"]);
}

#[tokio::test]
async fn test_sqlite_ledger_persists_between_runs() {
    let dir = create_test_dir();
    let path = dir.path().join("nested").join("app.sqlite3");
    let descriptor = path.display().to_string();
    assert_eq!(
        LedgerUrl::parse(&descriptor).unwrap(),
        LedgerUrl::Sqlite(path.clone())
    );

    let ctx = Context::background();
    let log = CallLog::new();
    let set = recording_set(&["a", "b"], &log);

    Orchestrator::open(&descriptor)
        .await
        .unwrap()
        .up(&ctx, &set)
        .await
        .unwrap();

    let reopened = Orchestrator::open(&descriptor).await.unwrap();
    reopened
        .down(&ctx, &recording_set(&["b"], &log))
        .await
        .unwrap();

    assert_eq!(log.entries(), vec!["up:a", "up:b", "down:b"]);
    assert_eq!(reopened.applied(&ctx).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_existing_connection_with_custom_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE app_data (id INTEGER PRIMARY KEY);")
        .unwrap();

    let ledger = Arc::new(SqliteLedger::from_connection(conn, "app_migrations").unwrap());
    let ctx = Context::background();
    let log = CallLog::new();

    Orchestrator::new(ledger.clone())
        .up(&ctx, &recording_set(&["x"], &log))
        .await
        .unwrap();

    assert_eq!(ledger.table(), "app_migrations");
    assert_eq!(ledger.list(&ctx).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_orchestrator_from_config_file() {
    let dir = create_test_dir();
    let config_path = dir.path().join("migrent.json");
    let config = MigrentConfig {
        ledger_url: format!("sqlite://{}", dir.path().join("ledger.db").display()),
        table_name: "schema_history".into(),
    };
    write_config(&config_path, &config).await.unwrap();

    let loaded = read_config(&config_path)
        .await
        .unwrap()
        .expect("Config should exist");
    let orchestrator = Orchestrator::from_config(&loaded).await.unwrap();

    let ctx = Context::background();
    let log = CallLog::new();
    orchestrator
        .up(&ctx, &recording_set(&["1"], &log))
        .await
        .unwrap();

    let conn = Connection::open(dir.path().join("ledger.db")).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_history", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_from_config_rejects_invalid_table() {
    let config = MigrentConfig {
        ledger_url: "sqlite::memory:".into(),
        table_name: "drop table".into(),
    };
    let result = Orchestrator::from_config(&config).await;
    assert!(matches!(result, Err(MigrationError::Config(_))));
}

#[tokio::test]
async fn test_from_config_with_keyword_table() {
    let config = MigrentConfig {
        ledger_url: "sqlite::memory:".into(),
        table_name: "order".into(),
    };
    assert!(config.validate().is_ok());

    let orchestrator = Orchestrator::from_config(&config).await.unwrap();
    let ctx = Context::background();
    let log = CallLog::new();
    let set = recording_set(&["1_a", "2_b"], &log);

    orchestrator
        .up(&ctx, &set)
        .await
        .expect("Up should succeed");
    orchestrator
        .up(&ctx, &set)
        .await
        .expect("Second up should succeed");

    assert_eq!(log.entries(), vec!["up:1_a", "up:2_b"]);
    assert_eq!(orchestrator.applied(&ctx).await.unwrap().len(), 2);
}
