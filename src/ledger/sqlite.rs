use super::{validate_name, LedgerError, LedgerRecord, LedgerStore};
use crate::context::Context;
use crate::migration::MigrationName;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::task::spawn_blocking;

/// Default name of the ledger table.
pub const DEFAULT_TABLE: &str = "migrations";

static TABLE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid table name pattern"));

/// Table names are spliced into SQL, so only plain identifiers are allowed.
/// Keywords such as `order` pass; statements always quote the name.
pub fn validate_table_name(table: &str) -> Result<(), LedgerError> {
    if TABLE_NAME_RE.is_match(table) {
        Ok(())
    } else {
        Err(LedgerError::InvalidTableName(table.to_string()))
    }
}

/// Ledger table in a SQLite database.
#[derive(Clone)]
pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
    table: String,
}

impl SqliteLedger {
    pub async fn open(path: impl AsRef<Path>, table: &str) -> Result<Self, LedgerError> {
        validate_table_name(table)?;
        let path = path.as_ref().to_owned();
        let conn = spawn_blocking(move || -> Result<Connection, LedgerError> {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Ok(Connection::open(path)?)
        })
        .await
        .map_err(|err| LedgerError::TaskJoin(err.to_string()))??;
        Self::from_connection(conn, table)
    }

    pub fn in_memory(table: &str) -> Result<Self, LedgerError> {
        validate_table_name(table)?;
        Self::from_connection(Connection::open_in_memory()?, table)
    }

    /// Wrap a connection the caller already holds.
    pub fn from_connection(conn: Connection, table: &str) -> Result<Self, LedgerError> {
        validate_table_name(table)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Table name as a quoted SQL identifier.
    fn quoted_table(&self) -> String {
        quote_identifier(&self.table)
    }

    async fn with_conn<F, T>(&self, ctx: &Context, func: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&Connection) -> Result<T, LedgerError> + Send + 'static,
        T: Send + 'static,
    {
        ctx.check()?;
        let conn = Arc::clone(&self.conn);
        spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| LedgerError::LockPoisoned)?;
            func(&guard)
        })
        .await
        .map_err(|err| LedgerError::TaskJoin(err.to_string()))?
    }
}

// Validated names never contain a double quote.
fn quote_identifier(table: &str) -> String {
    format!("\"{table}\"")
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
        params![table],
        |_| Ok(()),
    )
    .optional()
    .map(|row| row.is_some())
}

#[async_trait]
impl LedgerStore for SqliteLedger {
    async fn ensure_schema(&self, ctx: &Context) -> Result<(), LedgerError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                applied_at TEXT NOT NULL
            )",
            self.quoted_table()
        );
        self.with_conn(ctx, move |conn| {
            conn.execute_batch(&sql)?;
            Ok(())
        })
        .await
    }

    async fn find_by_name(&self, ctx: &Context, name: &MigrationName) -> Result<bool, LedgerError> {
        let sql = format!("SELECT 1 FROM {} WHERE name = ?1 LIMIT 1", self.quoted_table());
        let name = name.as_str().to_string();
        self.with_conn(ctx, move |conn| {
            let found = conn
                .query_row(&sql, params![name], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    async fn insert(
        &self,
        ctx: &Context,
        name: &MigrationName,
        applied_at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        validate_name(name)?;
        let sql = format!("INSERT INTO {} (name, applied_at) VALUES (?1, ?2)", self.quoted_table());
        let name = name.clone();
        self.with_conn(ctx, move |conn| {
            match conn.execute(&sql, params![name.as_str(), applied_at.to_rfc3339()]) {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    Err(LedgerError::Duplicate(name))
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn delete_by_name(&self, ctx: &Context, name: &MigrationName) -> Result<(), LedgerError> {
        let sql = format!("DELETE FROM {} WHERE name = ?1", self.quoted_table());
        let name = name.as_str().to_string();
        self.with_conn(ctx, move |conn| {
            conn.execute(&sql, params![name])?;
            Ok(())
        })
        .await
    }

    async fn list(&self, ctx: &Context) -> Result<Vec<LedgerRecord>, LedgerError> {
        let table = self.table.clone();
        self.with_conn(ctx, move |conn| {
            if !table_exists(conn, &table)? {
                return Ok(Vec::new());
            }

            let sql = format!(
                "SELECT id, name, applied_at FROM {} ORDER BY name",
                quote_identifier(&table)
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;

            let mut records = Vec::new();
            for row in rows {
                let (id, name, applied_at) = row?;
                let applied_at = DateTime::parse_from_rfc3339(&applied_at)
                    .map_err(|e| {
                        LedgerError::Corrupt(format!("bad applied_at for {name}: {e}"))
                    })?
                    .with_timezone(&Utc);
                records.push(LedgerRecord {
                    id: u64::try_from(id)
                        .map_err(|_| LedgerError::Corrupt(format!("negative id for {name}")))?,
                    name: MigrationName::from(name),
                    applied_at,
                });
            }
            Ok(records)
        })
        .await
    }
}
