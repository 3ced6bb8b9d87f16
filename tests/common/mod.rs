#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use migrent::{
    Context, LedgerError, LedgerRecord, LedgerStore, MemoryLedger, Migration, MigrationName,
    MigrationSet,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Create a temporary directory for on-disk ledgers
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Shared record of every migration call, in call order
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Migration that logs `up:<name>` / `down:<name>` and can be told to fail or stall
pub struct RecordingMigration {
    name: String,
    log: CallLog,
    fail_up: bool,
    fail_down: bool,
    delay: Option<Duration>,
}

impl RecordingMigration {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            fail_up: false,
            fail_down: false,
            delay: None,
        }
    }

    pub fn failing_up(mut self) -> Self {
        self.fail_up = true;
        self
    }

    pub fn failing_down(mut self) -> Self {
        self.fail_down = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn stall(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Migration for RecordingMigration {
    async fn up(&self, _ctx: &Context) -> anyhow::Result<()> {
        self.stall().await;
        self.log.push(format!("up:{}", self.name));
        if self.fail_up {
            anyhow::bail!("up failed for {}", self.name);
        }
        Ok(())
    }

    async fn down(&self, _ctx: &Context) -> anyhow::Result<()> {
        self.stall().await;
        self.log.push(format!("down:{}", self.name));
        if self.fail_down {
            anyhow::bail!("down failed for {}", self.name);
        }
        Ok(())
    }
}

/// Build a set of plain recording migrations
pub fn recording_set(names: &[&str], log: &CallLog) -> MigrationSet {
    names
        .iter()
        .map(|name| {
            let migration: Arc<dyn Migration> = Arc::new(RecordingMigration::new(name, log));
            (MigrationName::from(*name), migration)
        })
        .collect()
}

pub fn insert_migration(set: &mut MigrationSet, name: &str, migration: RecordingMigration) {
    set.insert(MigrationName::from(name), Arc::new(migration));
}

pub async fn ledger_names(store: &dyn LedgerStore) -> Vec<String> {
    store
        .list(&Context::background())
        .await
        .expect("Should list ledger")
        .into_iter()
        .map(|r| r.name.to_string())
        .collect()
}

/// Ledger that delegates to [`MemoryLedger`] but fails chosen operations
#[derive(Default)]
pub struct FaultyLedger {
    inner: MemoryLedger,
    fail_schema: bool,
    fail_find_for: Option<String>,
    fail_insert_for: Option<String>,
    fail_delete_for: Option<String>,
}

impl FaultyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_schema(mut self) -> Self {
        self.fail_schema = true;
        self
    }

    pub fn failing_find(mut self, name: &str) -> Self {
        self.fail_find_for = Some(name.to_string());
        self
    }

    pub fn failing_insert(mut self, name: &str) -> Self {
        self.fail_insert_for = Some(name.to_string());
        self
    }

    pub fn failing_delete(mut self, name: &str) -> Self {
        self.fail_delete_for = Some(name.to_string());
        self
    }
}

fn injected() -> LedgerError {
    LedgerError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        "injected ledger failure",
    ))
}

fn targets(target: &Option<String>, name: &MigrationName) -> bool {
    target.as_deref() == Some(name.as_str())
}

#[async_trait]
impl LedgerStore for FaultyLedger {
    async fn ensure_schema(&self, ctx: &Context) -> Result<(), LedgerError> {
        if self.fail_schema {
            return Err(injected());
        }
        self.inner.ensure_schema(ctx).await
    }

    async fn find_by_name(&self, ctx: &Context, name: &MigrationName) -> Result<bool, LedgerError> {
        if targets(&self.fail_find_for, name) {
            return Err(injected());
        }
        self.inner.find_by_name(ctx, name).await
    }

    async fn insert(
        &self,
        ctx: &Context,
        name: &MigrationName,
        applied_at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if targets(&self.fail_insert_for, name) {
            return Err(injected());
        }
        self.inner.insert(ctx, name, applied_at).await
    }

    async fn delete_by_name(&self, ctx: &Context, name: &MigrationName) -> Result<(), LedgerError> {
        if targets(&self.fail_delete_for, name) {
            return Err(injected());
        }
        self.inner.delete_by_name(ctx, name).await
    }

    async fn list(&self, ctx: &Context) -> Result<Vec<LedgerRecord>, LedgerError> {
        self.inner.list(ctx).await
    }
}
