//! Types for the migration system.

use crate::config::ConfigError;
use crate::context::{Context, DeadlineExceeded};
use crate::ledger::LedgerError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;

/// Unique name of a migration.
///
/// Names order byte-wise, which is also the execution order, so prefix them
/// with a number or date when order matters (`"001_users"`, `"20240102_seed"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationName(String);

impl MigrationName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MigrationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MigrationName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for MigrationName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for MigrationName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Error types for migration operations.
///
/// Every variant raised inside the apply/revert loop names the migration it
/// stopped at. After an error, the ledger tells how far the run got.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("create the internal migration table: {0}")]
    Schema(#[source] LedgerError),

    #[error("querying migration history for {name}: {source}")]
    Query {
        name: MigrationName,
        #[source]
        source: LedgerError,
    },

    #[error("migration({direction}) for {name}: {source}")]
    Unit {
        name: MigrationName,
        direction: MigrationDirection,
        #[source]
        source: anyhow::Error,
    },

    #[error("record migration({direction}) of {name}: {source}")]
    Record {
        name: MigrationName,
        direction: MigrationDirection,
        #[source]
        source: LedgerError,
    },

    #[error("invalid migration name: {0:?}")]
    InvalidName(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl MigrationError {
    /// Name of the migration the run stopped at, if the error is tied to one.
    pub fn migration_name(&self) -> Option<&MigrationName> {
        match self {
            Self::Query { name, .. } | Self::Unit { name, .. } | Self::Record { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }

    /// Whether the run stopped because the context deadline passed.
    pub fn is_deadline_exceeded(&self) -> bool {
        match self {
            Self::Schema(e) | Self::Ledger(e) => e.is_deadline_exceeded(),
            Self::Query { source, .. } | Self::Record { source, .. } => {
                source.is_deadline_exceeded()
            }
            Self::Unit { source, .. } => source.downcast_ref::<DeadlineExceeded>().is_some(),
            _ => false,
        }
    }
}

/// A single named migration.
///
/// The orchestrator knows nothing about what a migration touches. It calls
/// `up` at most once per application and `down` at most once per reversal,
/// and never retries either.
#[async_trait]
pub trait Migration: Send + Sync {
    /// Apply the migration.
    async fn up(&self, ctx: &Context) -> anyhow::Result<()>;

    /// Revert the migration.
    async fn down(&self, ctx: &Context) -> anyhow::Result<()>;
}

/// Direction of migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Applying migrations.
    Up,
    /// Reverting migrations.
    Down,
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => f.write_str("Up"),
            Self::Down => f.write_str("Down"),
        }
    }
}
