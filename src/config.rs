//! Configuration Module
//!
//! Handles loading adapter options from environment variables or a JSON
//! object, and the HTTP port for the standalone binary.

use std::env;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::engine::{ConnectOptions, TableRef};
use crate::error::{CacheError, Result};

/// Largest accepted sweep interval, the span of millisecond timestamps.
const MAX_FLUSH_INTERVAL: u64 = i64::MAX as u64;

/// Adapter configuration.
///
/// Deserializes from the option names a host framework passes in
/// (`host`, `port`, `db`, `table`, `flushInterval`, `max`, `user`,
/// `password`). Any other key is kept in `extra` and handed to the driver.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Storage engine host
    pub host: String,
    /// Storage engine port
    pub port: u16,
    /// Database holding the cache table
    pub db: String,
    /// Table holding cache records
    pub table: String,
    /// Expiry sweep interval in milliseconds
    pub flush_interval: u64,
    /// Connection pool size
    pub max: usize,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Unrecognized options, passed through to the driver
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CATBOX_HOST` - Engine host (default: 127.0.0.1)
    /// - `CATBOX_PORT` - Engine port (default: 28015)
    /// - `CATBOX_DB` - Database name (default: catbox)
    /// - `CATBOX_TABLE` - Table name (default: catbox)
    /// - `CATBOX_FLUSH_INTERVAL` - Sweep interval in ms (default: 60000)
    /// - `CATBOX_MAX` - Pool size (default: 100)
    /// - `CATBOX_USER` / `CATBOX_PASSWORD` - Optional credentials
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("CATBOX_HOST").unwrap_or(defaults.host),
            port: parse_env("CATBOX_PORT").unwrap_or(defaults.port),
            db: env::var("CATBOX_DB").unwrap_or(defaults.db),
            table: env::var("CATBOX_TABLE").unwrap_or(defaults.table),
            flush_interval: parse_env("CATBOX_FLUSH_INTERVAL").unwrap_or(defaults.flush_interval),
            max: parse_env("CATBOX_MAX").unwrap_or(defaults.max),
            user: env::var("CATBOX_USER").ok(),
            password: env::var("CATBOX_PASSWORD").ok(),
            extra: Map::new(),
        }
    }

    /// Rejects option values no connection could work with.
    pub fn validate(&self) -> Result<()> {
        if self.db.is_empty() {
            return Err(CacheError::Config("db must not be empty".to_string()));
        }
        if self.table.is_empty() {
            return Err(CacheError::Config("table must not be empty".to_string()));
        }
        if self.flush_interval == 0 {
            return Err(CacheError::Config(
                "flushInterval must be greater than zero".to_string(),
            ));
        }
        if self.flush_interval > MAX_FLUSH_INTERVAL {
            return Err(CacheError::Config("flushInterval is out of range".to_string()));
        }
        if self.max == 0 {
            return Err(CacheError::Config("max must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// The table cache records live in.
    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.db, &self.table)
    }

    /// Options handed to the driver on connect.
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            host: self.host.clone(),
            port: self.port,
            db: self.db.clone(),
            max: self.max,
            user: self.user.clone(),
            password: self.password.clone(),
            extra: self.extra.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 28015,
            db: "catbox".to_string(),
            table: "catbox".to_string(),
            flush_interval: 60_000,
            max: 100,
            user: None,
            password: None,
            extra: Map::new(),
        }
    }
}

/// HTTP settings for the standalone binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
}

impl ServerConfig {
    /// Reads `SERVER_PORT` (default: 3000).
    pub fn from_env() -> Self {
        Self {
            port: parse_env("SERVER_PORT").unwrap_or(3000),
        }
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 28015);
        assert_eq!(config.db, "catbox");
        assert_eq!(config.table, "catbox");
        assert_eq!(config.flush_interval, 60_000);
        assert_eq!(config.max, 100);
        assert!(config.user.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env() {
        env::set_var("CATBOX_TABLE", "sessions");
        env::set_var("CATBOX_FLUSH_INTERVAL", "not-a-number");
        env::remove_var("CATBOX_PORT");

        let config = Config::from_env();
        assert_eq!(config.table, "sessions");
        assert_eq!(config.flush_interval, 60_000);
        assert_eq!(config.port, 28015);

        env::remove_var("CATBOX_TABLE");
        env::remove_var("CATBOX_FLUSH_INTERVAL");
    }

    #[test]
    fn test_config_deserialize_keeps_unknown_options() {
        let config: Config = serde_json::from_value(json!({
            "db": "app",
            "flushInterval": 500,
            "timeout": 20,
            "ssl": {"ca": "cert"}
        }))
        .unwrap();

        assert_eq!(config.db, "app");
        assert_eq!(config.table, "catbox");
        assert_eq!(config.flush_interval, 500);
        assert_eq!(config.extra.get("timeout"), Some(&json!(20)));

        let options = config.connect_options();
        assert_eq!(options.db, "app");
        assert_eq!(options.extra.get("ssl"), Some(&json!({"ca": "cert"})));
    }

    #[test]
    fn test_config_validate() {
        let mut config = Config::default();
        config.flush_interval = 0;
        assert!(matches!(config.validate(), Err(CacheError::Config(_))));

        let mut config = Config::default();
        config.table = String::new();
        assert!(matches!(config.validate(), Err(CacheError::Config(_))));

        let mut config = Config::default();
        config.flush_interval = u64::MAX;
        assert!(matches!(config.validate(), Err(CacheError::Config(_))));

        config.flush_interval = MAX_FLUSH_INTERVAL;
        assert!(config.validate().is_ok());
    }
}
