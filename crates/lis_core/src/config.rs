//! Process configuration read from the environment.
//!
//! # Responsibility
//! - Resolve database location and logging settings for binaries.
//!
//! # Invariants
//! - Missing variables fall back to defaults; present but invalid values are
//!   reported, never silently replaced.

use crate::logging::{default_log_level, normalize_level, normalize_log_dir};
use log::LevelFilter;
use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "LIS_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "LIS_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "LIS_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "lis.sqlite3";

/// Resolved core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: LevelFilter,
    /// File logging is disabled when unset.
    pub log_dir: Option<PathBuf>,
}

impl CoreConfig {
    /// Reads `LIS_DB_PATH`, `LIS_LOG_LEVEL` and `LIS_LOG_DIR`.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let db_path = present(DB_PATH_VAR)
            .map(|value| PathBuf::from(value.trim()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE_NAME));

        let log_level = match present(LOG_LEVEL_VAR) {
            Some(value) => normalize_level(&value).map_err(|err| format!("{LOG_LEVEL_VAR}: {err}"))?,
            None => default_log_level(),
        };

        let log_dir = present(LOG_DIR_VAR)
            .map(|value| normalize_log_dir(&value).map_err(|err| format!("{LOG_DIR_VAR}: {err}")))
            .transpose()?;

        Ok(Self {
            db_path,
            log_level,
            log_dir,
        })
    }
}
