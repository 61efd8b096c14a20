//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::Serialize;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use bistro_core::StockPolicy;
use bistro_db::DbConfig;

/// Development secret; production deployments must set `JWT_SECRET`.
const DEV_JWT_SECRET: &str = "bistro-dev-secret-change-in-production";

/// API server configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ApiConfig {
    /// Listen address
    pub bind_addr: SocketAddr,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// Secret for signing session tokens
    #[serde(skip)]
    pub jwt_secret: String,

    /// Session token lifetime in seconds (default: 12 hours)
    pub jwt_lifetime_secs: i64,

    /// Let orders drive stock below zero instead of rejecting them
    pub allow_negative_stock: bool,

    /// Attempts at a sale transaction before answering 409
    pub sale_retries: u32,

    /// How often the kitchen display should poll, advertised via /health
    pub poll_interval_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_path: "./bistro.db".to_string(),
            db_max_connections: 5,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_lifetime_secs: 43_200,
            allow_negative_stock: false,
            sale_retries: 3,
            poll_interval_secs: 10,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = ApiConfig::default();

        let config = ApiConfig {
            bind_addr: parse_var("BISTRO_BIND_ADDR", defaults.bind_addr)?,
            database_path: env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_lifetime_secs: parse_var("JWT_LIFETIME_SECS", defaults.jwt_lifetime_secs)?,
            allow_negative_stock: parse_var(
                "BISTRO_ALLOW_NEGATIVE_STOCK",
                defaults.allow_negative_stock,
            )?,
            sale_retries: parse_var("BISTRO_SALE_RETRIES", defaults.sale_retries)?,
            poll_interval_secs: parse_var("BISTRO_POLL_INTERVAL_SECS", defaults.poll_interval_secs)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        if self.jwt_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_LIFETIME_SECS".to_string()));
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        Ok(())
    }

    /// Whether the signing secret is still the built-in development one.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn stock_policy(&self) -> StockPolicy {
        StockPolicy::from_allow_negative(self.allow_negative_stock)
    }

    /// Pool and sale settings for the database layer.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.db_max_connections)
            .stock_policy(self.stock_policy())
            .sale_retries(self.sale_retries)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.jwt_lifetime_secs, 43_200);
        assert_eq!(config.stock_policy(), StockPolicy::RejectInsufficient);
        assert!(config.uses_dev_secret());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_db_config_carries_sale_settings() {
        let config = ApiConfig {
            allow_negative_stock: true,
            sale_retries: 0,
            ..ApiConfig::default()
        };
        let db = config.db_config();
        assert_eq!(db.stock_policy, StockPolicy::AllowNegative);
        assert_eq!(db.sale_retries, 1);
    }

    #[test]
    fn test_invalid_lifetime_rejected() {
        let config = ApiConfig {
            jwt_lifetime_secs: 0,
            ..ApiConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_secret_is_never_serialized() {
        let json = serde_json::to_string(&ApiConfig::default()).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("poll_interval_secs"));
    }
}
