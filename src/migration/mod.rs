//! Migration orchestration.
//!
//! # Overview
//!
//! - A [`MigrationSet`] maps migration names to [`Migration`] implementations
//! - The [`Orchestrator`] runs the set against a ledger, one name at a time
//! - Names are executed in ascending byte-wise order in both directions
//! - A name recorded in the ledger is applied; `up` skips it, `down` reverts it
//! - The first failure stops the run and is returned with the migration name
//!
//! # Usage
//!
//! ```ignore
//! let orchestrator = Orchestrator::open("sqlite://state/ledger.db").await?;
//! let mut set = MigrationSet::new();
//! set.insert("001_seed_users".into(), Arc::new(SeedUsers::new(pool)));
//! orchestrator.up(&Context::background(), &set).await?;
//! ```

mod executor;
mod registry;
mod types;

pub use executor::{MigrationStatus, Orchestrator};
pub use registry::{sorted_migration_names, MigrationSet};
pub use types::{Migration, MigrationDirection, MigrationError, MigrationName};
