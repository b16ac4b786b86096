// ABOUTME: Runtime configuration for the loader, migrator and API server
// ABOUTME: Built once from the environment and passed explicitly to each component

use std::env;
use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

use crate::constants::{
    ANY_ORIGIN, DEFAULT_BATCH_SIZE, DEFAULT_CSV_PATH, DEFAULT_DATABASE_PATH, DEFAULT_HOST,
    DEFAULT_MAX_CONNECTIONS, DEFAULT_PORT,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {source}")]
    InvalidNumber {
        var: &'static str,
        #[source]
        source: ParseIntError,
    },
    #[error("Port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u16),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_path: PathBuf,
    pub csv_path: PathBuf,
    pub batch_size: usize,
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    pub max_connections: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            batch_size: DEFAULT_BATCH_SIZE,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origin: ANY_ORIGIN.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, falling back to defaults
    /// for every key the lookup does not provide.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database_path = lookup("CATALOG_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let csv_path = lookup("CATALOG_CSV_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.csv_path);

        let batch_size = match lookup("CATALOG_BATCH_SIZE") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|source| ConfigError::InvalidNumber {
                    var: "CATALOG_BATCH_SIZE",
                    source,
                })?,
            None => defaults.batch_size,
        };
        if batch_size == 0 {
            return Err(ConfigError::Zero("CATALOG_BATCH_SIZE"));
        }

        let host = lookup("CATALOG_HOST").unwrap_or(defaults.host);

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|source| ConfigError::InvalidNumber { var: "PORT", source })?,
            None => defaults.port,
        };
        if port == 0 {
            return Err(ConfigError::PortOutOfRange(port));
        }

        let cors_origin = lookup("CORS_ORIGIN").unwrap_or(defaults.cors_origin);

        let max_connections = match lookup("CATALOG_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|source| ConfigError::InvalidNumber {
                    var: "CATALOG_MAX_CONNECTIONS",
                    source,
                })?,
            None => defaults.max_connections,
        };
        if max_connections == 0 {
            return Err(ConfigError::Zero("CATALOG_MAX_CONNECTIONS"));
        }

        Ok(Config {
            database_path,
            csv_path,
            batch_size,
            host,
            port,
            cors_origin,
            max_connections,
        })
    }

    /// Whether CORS should accept any origin
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origin.trim() == ANY_ORIGIN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.port, 5000);
        assert_eq!(config.batch_size, 1000);
        assert!(config.allows_any_origin());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("CATALOG_DATABASE_PATH", "/tmp/shop.db"),
            ("CATALOG_BATCH_SIZE", "250"),
            ("PORT", "8080"),
            ("CORS_ORIGIN", "http://localhost:8000"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/shop.db"));
        assert_eq!(config.batch_size, 250);
        assert_eq!(config.port, 8080);
        assert!(!config.allows_any_origin());
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { var: "PORT", .. }));

        let err = Config::from_lookup(lookup_from(&[("PORT", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::PortOutOfRange(0)));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let err = Config::from_lookup(lookup_from(&[("CATALOG_BATCH_SIZE", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Zero("CATALOG_BATCH_SIZE")));
    }
}
