pub mod config;
pub mod context;
pub mod ledger;
pub mod migration;

// Re-export commonly used types
pub use config::{read_config, write_config, ConfigError, MigrentConfig};
pub use context::{Context, DeadlineExceeded};
pub use ledger::{
    open_ledger, JsonLedger, LedgerError, LedgerRecord, LedgerStore, LedgerUrl, MemoryLedger,
    SqliteLedger,
};
pub use migration::{
    sorted_migration_names, Migration, MigrationDirection, MigrationError, MigrationName,
    MigrationSet, MigrationStatus, Orchestrator,
};

/// Open an orchestrator on the ledger described by `descriptor`.
pub async fn open(descriptor: &str) -> Result<Orchestrator, MigrationError> {
    Orchestrator::open(descriptor).await
}
