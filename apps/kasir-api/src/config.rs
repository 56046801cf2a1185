//! API server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;

use kasir_core::DEFAULT_LOW_STOCK_THRESHOLD;

/// Fallback signing secret for local development.
const DEV_JWT_SECRET: &str = "kasir-dev-secret-change-in-production";

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Maximum pooled SQLite connections
    pub database_max_connections: u32,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,

    /// Allowed browser origin for CORS (any origin when unset)
    pub cors_origin: Option<String>,

    /// Stock level at or below which inventory reports flag a product
    pub low_stock_threshold: i64,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ApiConfig {
            http_port: parse_var("KASIR_HTTP_PORT", "8080")?,

            database_path: env::var("KASIR_DB_PATH").unwrap_or_else(|_| "./kasir.db".to_string()),

            database_max_connections: parse_var("KASIR_DB_MAX_CONNECTIONS", "5")?,

            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| DEV_JWT_SECRET.to_string()),

            jwt_access_lifetime_secs: parse_var("JWT_ACCESS_LIFETIME_SECS", "43200")?, // 12 hours

            cors_origin: env::var("KASIR_CORS_ORIGIN").ok().filter(|o| !o.trim().is_empty()),

            low_stock_threshold: parse_var(
                "KASIR_LOW_STOCK_THRESHOLD",
                &DEFAULT_LOW_STOCK_THRESHOLD.to_string(),
            )?,
        };

        if config.jwt_secret.len() < 16 {
            return Err(ConfigError::InvalidValue("JWT_SECRET".to_string()));
        }
        if config.jwt_access_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("JWT_ACCESS_LIFETIME_SECS".to_string()));
        }

        Ok(config)
    }

    /// True when no `JWT_SECRET` was provided.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// Configuration for tests: in-memory database, fixed secret.
    pub fn for_tests() -> Self {
        ApiConfig {
            http_port: 0,
            database_path: ":memory:".to_string(),
            database_max_connections: 1,
            jwt_secret: "kasir-test-secret-0123456789".to_string(),
            jwt_access_lifetime_secs: 3600,
            cors_origin: None,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
