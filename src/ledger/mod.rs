//! Ledger of applied migrations.
//!
//! The ledger holds one record per applied migration name. The orchestrator
//! only asks it four things: make sure storage exists, whether a name is
//! recorded, record a name, and forget a name. Three stores are provided:
//!
//! - [`MemoryLedger`]: process-local, for tests and throwaway runs
//! - [`JsonLedger`]: a single JSON document on disk
//! - [`SqliteLedger`]: a `migrations` table in a SQLite database
//!
//! Stores are picked from a descriptor string with [`LedgerUrl::parse`] and
//! [`open_ledger`].

mod json;
mod memory;
mod sqlite;
mod types;
mod url;

pub use json::JsonLedger;
pub use memory::MemoryLedger;
pub use sqlite::{validate_table_name, SqliteLedger, DEFAULT_TABLE};
pub use types::{LedgerFile, LedgerRecord, LEDGER_SCHEMA_VERSION};
pub use url::LedgerUrl;

use crate::context::{Context, DeadlineExceeded};
use crate::migration::MigrationName;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Migration already recorded: {0}")]
    Duplicate(MigrationName),

    #[error("Migration name must not be empty")]
    InvalidName(MigrationName),

    #[error("Invalid ledger table name: {0:?}")]
    InvalidTableName(String),

    #[error("Unsupported ledger descriptor: {0:?}")]
    UnsupportedDescriptor(String),

    #[error("Corrupt ledger: {0}")]
    Corrupt(String),

    #[error("Ledger task failed: {0}")]
    TaskJoin(String),

    #[error("Ledger lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    DeadlineExceeded(#[from] DeadlineExceeded),
}

impl LedgerError {
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded(_))
    }
}

/// Persistence for the set of applied migration names.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Create the ledger storage if it does not exist. Safe to call repeatedly.
    async fn ensure_schema(&self, ctx: &Context) -> Result<(), LedgerError>;

    /// Whether a record exists for `name`.
    async fn find_by_name(&self, ctx: &Context, name: &MigrationName) -> Result<bool, LedgerError>;

    /// Record `name` as applied. Fails with [`LedgerError::Duplicate`] if it is
    /// already recorded.
    async fn insert(
        &self,
        ctx: &Context,
        name: &MigrationName,
        applied_at: DateTime<Utc>,
    ) -> Result<(), LedgerError>;

    /// Remove the record for `name`. Removing an absent name is not an error.
    async fn delete_by_name(&self, ctx: &Context, name: &MigrationName) -> Result<(), LedgerError>;

    /// All records, sorted by name. Returns an empty list if the storage has
    /// not been created yet.
    async fn list(&self, ctx: &Context) -> Result<Vec<LedgerRecord>, LedgerError>;
}

/// Names are required; stores reject empty ones at write time.
pub(crate) fn validate_name(name: &MigrationName) -> Result<(), LedgerError> {
    if name.is_empty() {
        return Err(LedgerError::InvalidName(name.clone()));
    }
    Ok(())
}

/// Open the ledger described by `url`. `table` only applies to SQLite.
pub async fn open_ledger(
    url: &LedgerUrl,
    table: &str,
) -> Result<Arc<dyn LedgerStore>, LedgerError> {
    info!(ledger = %url, "Opening migration ledger");
    let store: Arc<dyn LedgerStore> = match url {
        LedgerUrl::Memory => Arc::new(MemoryLedger::new()),
        LedgerUrl::SqliteMemory => Arc::new(SqliteLedger::in_memory(table)?),
        LedgerUrl::Sqlite(path) => Arc::new(SqliteLedger::open(path, table).await?),
        LedgerUrl::Json(path) => Arc::new(JsonLedger::new(path)),
    };
    Ok(store)
}
