//! Orchestrator for applying and reverting migration sets.

use super::registry::{sorted_migration_names, MigrationSet};
use super::types::{MigrationDirection, MigrationError, MigrationName};
use crate::config::MigrentConfig;
use crate::context::Context;
use crate::ledger::{open_ledger, LedgerError, LedgerRecord, LedgerStore, LedgerUrl, DEFAULT_TABLE};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Ledger state of one requested migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub name: MigrationName,
    /// When it was applied, `None` if it is pending.
    pub applied_at: Option<DateTime<Utc>>,
}

impl MigrationStatus {
    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

/// Applies and reverts migration sets against a ledger.
///
/// The ledger is the only source of truth: a migration whose name is recorded
/// is applied, anything else is not. Both directions walk names in ascending
/// byte-wise order and stop at the first failure. Migrations completed before
/// the failure stay recorded; nothing is undone automatically.
///
/// There is no locking across processes. Run one orchestrator at a time
/// against a given ledger.
#[derive(Clone)]
pub struct Orchestrator {
    ledger: Arc<dyn LedgerStore>,
}

impl Orchestrator {
    /// Wrap an existing ledger store.
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self { ledger }
    }

    /// Open the ledger described by `descriptor` using the default table name.
    pub async fn open(descriptor: &str) -> Result<Self, MigrationError> {
        let url = LedgerUrl::parse(descriptor)?;
        Ok(Self::new(open_ledger(&url, DEFAULT_TABLE).await?))
    }

    pub async fn from_config(config: &MigrentConfig) -> Result<Self, MigrationError> {
        config.validate()?;
        let url = LedgerUrl::parse(&config.ledger_url)?;
        Ok(Self::new(open_ledger(&url, &config.table_name).await?))
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerStore> {
        &self.ledger
    }

    /// Apply every migration in `set` that the ledger does not list yet.
    ///
    /// A set containing an empty name is rejected before the ledger is
    /// touched.
    ///
    /// Each successful `up` is followed by a ledger insert. If that insert
    /// fails the migration has run but is not recorded; the returned
    /// [`MigrationError::Record`] is the only trace of it.
    pub async fn up(&self, ctx: &Context, set: &MigrationSet) -> Result<(), MigrationError> {
        self.run(ctx, set, MigrationDirection::Up).await
    }

    /// Revert every migration in `set` that the ledger lists.
    ///
    /// Names run in the same ascending order as [`Orchestrator::up`]. Names the
    /// ledger does not list are skipped without touching the migration.
    ///
    /// An empty name can never be in the ledger, but a set containing one is
    /// still rejected with [`MigrationError::InvalidName`] in both directions,
    /// before the ledger is touched.
    pub async fn down(&self, ctx: &Context, set: &MigrationSet) -> Result<(), MigrationError> {
        self.run(ctx, set, MigrationDirection::Down).await
    }

    async fn run(
        &self,
        ctx: &Context,
        set: &MigrationSet,
        direction: MigrationDirection,
    ) -> Result<(), MigrationError> {
        let names = sorted_migration_names(set);
        if let Some(empty) = names.iter().find(|n| n.is_empty()) {
            return Err(MigrationError::InvalidName(empty.to_string()));
        }

        // Create internal table if not exists
        ctx.run(self.ledger.ensure_schema(ctx))
            .await
            .map_err(LedgerError::from)
            .and_then(|r| r)
            .map_err(MigrationError::Schema)?;

        let mut executed = 0usize;
        for name in names {
            let applied = ctx
                .run(self.ledger.find_by_name(ctx, name))
                .await
                .map_err(LedgerError::from)
                .and_then(|r| r)
                .map_err(|source| MigrationError::Query {
                    name: name.clone(),
                    source,
                })?;

            let pending = match direction {
                MigrationDirection::Up => !applied,
                MigrationDirection::Down => applied,
            };
            if !pending {
                debug!(migration = %name, %direction, "Nothing to do, skipping");
                continue;
            }

            let migration = &set[name];
            info!(migration = %name, %direction, "Running migration");
            let result = match direction {
                MigrationDirection::Up => ctx.run(migration.up(ctx)).await,
                MigrationDirection::Down => ctx.run(migration.down(ctx)).await,
            };
            result
                .map_err(anyhow::Error::from)
                .and_then(|r| r)
                .map_err(|source| MigrationError::Unit {
                    name: name.clone(),
                    direction,
                    source,
                })?;

            let recorded = match direction {
                MigrationDirection::Up => ctx.run(self.ledger.insert(ctx, name, Utc::now())).await,
                MigrationDirection::Down => ctx.run(self.ledger.delete_by_name(ctx, name)).await,
            };
            recorded
                .map_err(LedgerError::from)
                .and_then(|r| r)
                .map_err(|source| MigrationError::Record {
                    name: name.clone(),
                    direction,
                    source,
                })?;

            executed += 1;
        }

        info!(
            %direction,
            requested = set.len(),
            executed,
            "Migration run completed"
        );
        Ok(())
    }

    /// Ledger state of every name in `set`, in execution order.
    ///
    /// Read-only: an uninitialized ledger reports everything as pending.
    pub async fn status(
        &self,
        ctx: &Context,
        set: &MigrationSet,
    ) -> Result<Vec<MigrationStatus>, MigrationError> {
        let applied: HashMap<MigrationName, DateTime<Utc>> = self
            .applied(ctx)
            .await?
            .into_iter()
            .map(|r| (r.name, r.applied_at))
            .collect();

        Ok(sorted_migration_names(set)
            .into_iter()
            .map(|name| MigrationStatus {
                name: name.clone(),
                applied_at: applied.get(name).copied(),
            })
            .collect())
    }

    /// Every record in the ledger, sorted by name.
    pub async fn applied(&self, ctx: &Context) -> Result<Vec<LedgerRecord>, MigrationError> {
        let records = ctx
            .run(self.ledger.list(ctx))
            .await
            .map_err(LedgerError::from)
            .and_then(|r| r)?;
        Ok(records)
    }
}
