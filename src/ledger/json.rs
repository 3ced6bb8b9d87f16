use super::types::{LedgerFile, LEDGER_SCHEMA_VERSION};
use super::{validate_name, LedgerError, LedgerRecord, LedgerStore};
use crate::context::Context;
use crate::migration::MigrationName;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

/// Ledger stored as a single JSON document.
///
/// Every operation reads the file; writes go to a temp file first and are
/// renamed into place. The lock only serializes callers sharing this value.
#[derive(Debug)]
pub struct JsonLedger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the ledger document, or an empty one if the file does not exist.
    async fn read_unlocked(&self) -> Result<LedgerFile, LedgerError> {
        if !fs::try_exists(&self.path).await? {
            return Ok(LedgerFile::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        let file: LedgerFile = serde_json::from_str(&content)?;
        if file.schema_version > LEDGER_SCHEMA_VERSION {
            return Err(LedgerError::Corrupt(format!(
                "unsupported ledger schema version {} in {}",
                file.schema_version,
                self.path.display()
            )));
        }
        Ok(file)
    }

    /// Write the ledger document (caller must hold lock)
    async fn write_unlocked(&self, file: &mut LedgerFile) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        file.updated_at = Utc::now().to_rfc3339();

        // Write atomically using temp file + rename
        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(file)?;
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for JsonLedger {
    async fn ensure_schema(&self, ctx: &Context) -> Result<(), LedgerError> {
        ctx.check()?;
        let _guard = self.lock.lock().await;
        if fs::try_exists(&self.path).await? {
            // Validate what is already there
            self.read_unlocked().await?;
            return Ok(());
        }
        self.write_unlocked(&mut LedgerFile::new()).await
    }

    async fn find_by_name(&self, ctx: &Context, name: &MigrationName) -> Result<bool, LedgerError> {
        ctx.check()?;
        let _guard = self.lock.lock().await;
        Ok(self.read_unlocked().await?.contains(name))
    }

    async fn insert(
        &self,
        ctx: &Context,
        name: &MigrationName,
        applied_at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        ctx.check()?;
        validate_name(name)?;
        let _guard = self.lock.lock().await;
        let mut file = self.read_unlocked().await?;
        if file.contains(name) {
            return Err(LedgerError::Duplicate(name.clone()));
        }

        file.migrations.push(LedgerRecord {
            id: file.next_id,
            name: name.clone(),
            applied_at,
        });
        file.next_id += 1;
        self.write_unlocked(&mut file).await
    }

    async fn delete_by_name(&self, ctx: &Context, name: &MigrationName) -> Result<(), LedgerError> {
        ctx.check()?;
        let _guard = self.lock.lock().await;
        let mut file = self.read_unlocked().await?;
        let before = file.migrations.len();
        file.migrations.retain(|r| &r.name != name);
        if file.migrations.len() == before {
            return Ok(());
        }
        self.write_unlocked(&mut file).await
    }

    async fn list(&self, ctx: &Context) -> Result<Vec<LedgerRecord>, LedgerError> {
        ctx.check()?;
        let _guard = self.lock.lock().await;
        let mut records = self.read_unlocked().await?.migrations;
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }
}
