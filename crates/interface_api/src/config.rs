//! API configuration
//!
//! Loaded from `API_*` environment variables (a `.env` file is read first
//! by the server binary). Every key has a default.

use serde::Deserialize;

/// Where declarations and participant data are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    /// Process-local storage; data is lost on restart
    Memory,
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database URL, used when `storage` is `postgres`
    pub database_url: String,
    /// Log level, overridden by `RUST_LOG`
    pub log_level: String,
    pub storage: StorageBackend,
    /// Maximum database pool size
    pub max_connections: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "postgres://localhost/cpd_funding".to_string(),
            log_level: "info".to_string(),
            storage: StorageBackend::Postgres,
            max_connections: 10,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_*` environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(config::Environment::with_prefix("API"))
    }

    /// Loads configuration from `source` layered over the defaults
    pub fn load(source: config::Environment) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("database_url", defaults.database_url)?
            .set_default("log_level", defaults.log_level)?
            .set_default("storage", "postgres")?
            .set_default("max_connections", i64::from(defaults.max_connections))?
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn environment(vars: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::with_prefix("API").source(Some(map))
    }

    #[test]
    fn test_defaults_apply_without_variables() {
        let config = ApiConfig::load(environment(&[])).unwrap();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.max_connections, 10);
    }

    #[test]
    fn test_variables_override_defaults() {
        let config = ApiConfig::load(environment(&[
            ("API_PORT", "9090"),
            ("API_STORAGE", "memory"),
            ("API_LOG_LEVEL", "debug"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_unknown_storage_is_rejected() {
        assert!(ApiConfig::load(environment(&[("API_STORAGE", "redis")])).is_err());
    }
}
