//! Migration sets and their execution order.

use super::types::{Migration, MigrationName};
use std::collections::HashMap;
use std::sync::Arc;

/// Caller-supplied mapping of migration name to migration.
///
/// Insertion order carries no meaning; see [`sorted_migration_names`].
pub type MigrationSet = HashMap<MigrationName, Arc<dyn Migration>>;

/// Names of `set` in execution order (ascending byte-wise).
///
/// The same order is used for both directions.
pub fn sorted_migration_names(set: &MigrationSet) -> Vec<&MigrationName> {
    let mut names: Vec<&MigrationName> = set.keys().collect();
    names.sort();
    names
}
