//! Runtime configuration resolved from the environment.
//!
//! | Variable               | Default                               |
//! |------------------------|---------------------------------------|
//! | `MANUSCRIPT_DB_PATH`   | `<temp>/manuscript.sqlite3`           |
//! | `MANUSCRIPT_LOG_LEVEL` | `debug` (debug builds) / `info`       |
//! | `MANUSCRIPT_LOG_DIR`   | `<temp>/manuscript-logs`              |
//!
//! Blank values fall back to the default.

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "MANUSCRIPT_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "MANUSCRIPT_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "MANUSCRIPT_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "manuscript.sqlite3";
const DEFAULT_LOG_DIR_NAME: &str = "manuscript-logs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: PathBuf,
}

impl CoreConfig {
    /// Reads the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through `lookup`, which maps a variable name
    /// to its raw value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            db_path: non_blank(DB_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)),
            log_level: non_blank(LOG_LEVEL_ENV).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: non_blank(LOG_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_LOG_DIR_NAME)),
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
