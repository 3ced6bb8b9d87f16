use crate::migration::MigrationName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current layout version of the JSON ledger document.
pub const LEDGER_SCHEMA_VERSION: u32 = 1;

/// One applied migration.
///
/// Existence of the record is what marks a migration as applied; `applied_at`
/// is informational and never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    /// Surrogate key, not used for any decision
    pub id: u64,
    pub name: MigrationName,
    pub applied_at: DateTime<Utc>,
}

/// The ledger document written by [`super::JsonLedger`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerFile {
    /// Schema version for future layout changes
    pub schema_version: u32,

    /// When the ledger was last modified
    pub updated_at: String,

    /// Next surrogate id to hand out
    pub next_id: u64,

    pub migrations: Vec<LedgerRecord>,
}

impl LedgerFile {
    pub fn new() -> Self {
        Self {
            schema_version: LEDGER_SCHEMA_VERSION,
            updated_at: Utc::now().to_rfc3339(),
            next_id: 1,
            migrations: Vec::new(),
        }
    }

    pub fn contains(&self, name: &MigrationName) -> bool {
        self.migrations.iter().any(|r| &r.name == name)
    }
}

impl Default for LedgerFile {
    fn default() -> Self {
        Self::new()
    }
}
