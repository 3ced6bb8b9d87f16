use super::LedgerError;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Parsed ledger descriptor.
///
/// Accepted forms:
///
/// - `memory:` or `memory`
/// - `sqlite::memory:`
/// - `sqlite://<path>` or `sqlite:<path>`
/// - `json://<path>` or `json:<path>`
/// - a bare path ending in `.json`, `.db`, `.sqlite` or `.sqlite3`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerUrl {
    Memory,
    SqliteMemory,
    Sqlite(PathBuf),
    Json(PathBuf),
}

impl LedgerUrl {
    pub fn parse(descriptor: &str) -> Result<Self, LedgerError> {
        let trimmed = descriptor.trim();
        let unsupported = || LedgerError::UnsupportedDescriptor(descriptor.to_string());

        if trimmed == "memory" || trimmed == "memory:" {
            return Ok(Self::Memory);
        }
        if trimmed == "sqlite::memory:" {
            return Ok(Self::SqliteMemory);
        }
        if let Some(rest) = strip_scheme(trimmed, "sqlite") {
            return non_empty_path(rest).map(Self::Sqlite).ok_or_else(unsupported);
        }
        if let Some(rest) = strip_scheme(trimmed, "json") {
            return non_empty_path(rest).map(Self::Json).ok_or_else(unsupported);
        }

        let path = non_empty_path(trimmed).ok_or_else(unsupported)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Self::Json(path)),
            Some("db" | "sqlite" | "sqlite3") => Ok(Self::Sqlite(path)),
            _ => Err(unsupported()),
        }
    }
}

fn strip_scheme<'a>(descriptor: &'a str, scheme: &str) -> Option<&'a str> {
    let rest = descriptor.strip_prefix(scheme)?.strip_prefix(':')?;
    Some(rest.strip_prefix("//").unwrap_or(rest))
}

fn non_empty_path(raw: &str) -> Option<PathBuf> {
    if raw.is_empty() {
        None
    } else {
        Some(PathBuf::from(raw))
    }
}

impl FromStr for LedgerUrl {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for LedgerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory:"),
            Self::SqliteMemory => f.write_str("sqlite::memory:"),
            Self::Sqlite(path) => write!(f, "sqlite://{}", path.display()),
            Self::Json(path) => write!(f, "json://{}", path.display()),
        }
    }
}
