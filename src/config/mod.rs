use crate::ledger::{validate_table_name, LedgerUrl, DEFAULT_TABLE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Environment variable overriding [`MigrentConfig::ledger_url`]
pub const LEDGER_URL_ENV: &str = "MIGRENT_LEDGER_URL";

/// Environment variable overriding [`MigrentConfig::table_name`]
pub const TABLE_ENV: &str = "MIGRENT_TABLE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

fn default_ledger_url() -> String {
    "memory:".to_string()
}

fn default_table_name() -> String {
    DEFAULT_TABLE.to_string()
}

/// Where the ledger lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrentConfig {
    /// Ledger descriptor, see [`LedgerUrl`]. Default is an in-memory ledger.
    #[serde(default = "default_ledger_url")]
    pub ledger_url: String,
    /// Ledger table name (SQLite only).
    #[serde(default = "default_table_name")]
    pub table_name: String,
}

impl Default for MigrentConfig {
    fn default() -> Self {
        Self {
            ledger_url: default_ledger_url(),
            table_name: default_table_name(),
        }
    }
}

impl MigrentConfig {
    /// Override fields from `MIGRENT_LEDGER_URL` and `MIGRENT_TABLE` when set.
    pub fn apply_env(mut self) -> Self {
        self.apply_overrides(
            std::env::var(LEDGER_URL_ENV).ok(),
            std::env::var(TABLE_ENV).ok(),
        );
        self
    }

    fn apply_overrides(&mut self, ledger_url: Option<String>, table_name: Option<String>) {
        if let Some(url) = ledger_url.filter(|v| !v.trim().is_empty()) {
            self.ledger_url = url;
        }
        if let Some(table) = table_name.filter(|v| !v.trim().is_empty()) {
            self.table_name = table;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        LedgerUrl::parse(&self.ledger_url).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        validate_table_name(&self.table_name).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}

/// Read the configuration file
pub async fn read_config(config_path: &Path) -> Result<Option<MigrentConfig>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(config_path).await?;
    let config: MigrentConfig = serde_json::from_str(&content)?;
    Ok(Some(config))
}

/// Write the configuration file
pub async fn write_config(config_path: &Path, config: &MigrentConfig) -> Result<(), ConfigError> {
    let content = serde_json::to_string_pretty(config)?;
    fs::write(config_path, content).await?;
    Ok(())
}
