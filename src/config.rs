//! Runtime configuration. Built-in defaults are merged with an optional
//! `inventory.toml` (in the data directory, then the working directory) and
//! finally with `INVENTORY_`-prefixed environment variables, e.g.
//! `INVENTORY_DATABASE_PATH=/tmp/books.sqlite`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::BaseDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".book-inventory";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "books.sqlite";
/// Log file written next to the database.
const LOG_FILE_NAME: &str = "inventory.log";
/// Optional configuration file name.
const CONFIG_FILE_NAME: &str = "inventory.toml";
/// Environment variable prefix.
const ENV_PREFIX: &str = "INVENTORY_";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// SQLite database holding the catalog.
    /// TOML: `database_path`. Default: `~/.book-inventory/books.sqlite`.
    pub database_path: PathBuf,
    /// File receiving log output; the terminal belongs to the UI.
    /// TOML: `log_path`. Default: `~/.book-inventory/inventory.log`.
    pub log_path: PathBuf,
    /// `tracing` filter directive, overridden by `RUST_LOG` when set.
    /// TOML: `log_level`. Default: `info`.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = data_dir();
        Self {
            database_path: data_dir.join(DB_FILE_NAME),
            log_path: data_dir.join(LOG_FILE_NAME),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Builds a Figment that merges defaults, config files and environment.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(data_dir().join(CONFIG_FILE_NAME)))
            .merge(Toml::file(CONFIG_FILE_NAME))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn load() -> Result<Self> {
        Self::figment()
            .extract()
            .context("failed to load configuration")
    }
}

/// Application data directory inside the user's home, or a relative fallback
/// when no home directory can be found.
fn data_dir() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(DATA_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_live_in_the_data_directory() {
        let config = Config::default();
        assert!(config.database_path.ends_with(".book-inventory/books.sqlite"));
        assert!(config.log_path.ends_with(".book-inventory/inventory.log"));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn later_sources_override_defaults() {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string("database_path = \"/tmp/shop.sqlite\"\nlog_level = \"debug\""))
            .extract()
            .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/shop.sqlite"));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_path, Config::default().log_path);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string("colour = \"blue\""))
            .extract::<Config>();
        assert!(result.is_err());
    }
}
