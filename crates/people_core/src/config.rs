//! Process configuration for the people store.
//!
//! # Responsibility
//! - Read connection string and logging options from the environment.
//! - Load a `.env` file first when one is present.
//!
//! # Invariants
//! - Loading configuration never panics; absent values fall back to defaults.

use crate::logging::default_log_level;
use std::env;

/// Primary variable holding the store connection string.
pub const DB_URI_VAR: &str = "PEOPLE_DB_URI";
/// Secondary connection string variable, read when `PEOPLE_DB_URI` is unset.
pub const FALLBACK_DB_URI_VAR: &str = "DATABASE_URL";
pub const LOG_LEVEL_VAR: &str = "PEOPLE_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "PEOPLE_LOG_DIR";
pub const DEFAULT_DB_URI: &str = "people.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_uri: String,
    pub log_level: String,
    /// File logging stays off when unset.
    pub log_dir: Option<String>,
}

impl AppConfig {
    /// Loads `.env` (if any) and then reads the process environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            database_uri: non_blank(DB_URI_VAR)
                .or_else(|| non_blank(FALLBACK_DB_URI_VAR))
                .unwrap_or_else(|| DEFAULT_DB_URI.to_string()),
            log_level: non_blank(LOG_LEVEL_VAR)
                .unwrap_or_else(|| default_log_level().to_string()),
            log_dir: non_blank(LOG_DIR_VAR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, DEFAULT_DB_URI};
    use crate::logging::default_log_level;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| values.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]);
        assert_eq!(config.database_uri, DEFAULT_DB_URI);
        assert_eq!(config.log_level, default_log_level());
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn primary_uri_wins_over_fallback() {
        let config = config_from(&[
            ("PEOPLE_DB_URI", "sqlite::memory:"),
            ("DATABASE_URL", "/tmp/other.db"),
        ]);
        assert_eq!(config.database_uri, "sqlite::memory:");
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = config_from(&[
            ("PEOPLE_DB_URI", "  "),
            ("DATABASE_URL", "/tmp/people.db"),
            ("PEOPLE_LOG_DIR", ""),
        ]);
        assert_eq!(config.database_uri, "/tmp/people.db");
        assert_eq!(config.log_dir, None);
    }
}
