use super::{validate_name, LedgerError, LedgerRecord, LedgerStore};
use crate::context::Context;
use crate::migration::MigrationName;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Ledger kept in process memory. Lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    last_id: u64,
    records: BTreeMap<MigrationName, LedgerRecord>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, LedgerError> {
        self.state.lock().map_err(|_| LedgerError::LockPoisoned)
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn ensure_schema(&self, ctx: &Context) -> Result<(), LedgerError> {
        ctx.check()?;
        Ok(())
    }

    async fn find_by_name(&self, ctx: &Context, name: &MigrationName) -> Result<bool, LedgerError> {
        ctx.check()?;
        Ok(self.state()?.records.contains_key(name))
    }

    async fn insert(
        &self,
        ctx: &Context,
        name: &MigrationName,
        applied_at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        ctx.check()?;
        validate_name(name)?;
        let mut state = self.state()?;
        if state.records.contains_key(name) {
            return Err(LedgerError::Duplicate(name.clone()));
        }
        state.last_id += 1;
        let record = LedgerRecord {
            id: state.last_id,
            name: name.clone(),
            applied_at,
        };
        state.records.insert(name.clone(), record);
        Ok(())
    }

    async fn delete_by_name(&self, ctx: &Context, name: &MigrationName) -> Result<(), LedgerError> {
        ctx.check()?;
        self.state()?.records.remove(name);
        Ok(())
    }

    async fn list(&self, ctx: &Context) -> Result<Vec<LedgerRecord>, LedgerError> {
        ctx.check()?;
        Ok(self.state()?.records.values().cloned().collect())
    }
}
