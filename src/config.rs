//! Environment-driven server configuration.
//!
//! Everything has a development-friendly default except the signing secret,
//! which must be present and at least 32 bytes; startup fails closed
//! otherwise.

use crate::auth::token::MIN_SECRET_BYTES;
use crate::db::pool::PoolSettings;
use crate::error::ConfigError;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub pool: PoolSettings,
    pub shutdown_timeout: Duration,
    /// Origins allowed by the CORS layer. Empty means same-origin only.
    pub allowed_origins: Vec<String>,
    pub rate_limit_enabled: bool,
    pub rate_limit_per_minute: u32,
    pub rate_limit_burst: u32,
    pub body_limit_bytes: usize,
    pub bind_addr: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingVar("JWT_SECRET"))?;
        if jwt_secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::WeakSecret {
                got: jwt_secret.len(),
                min: MIN_SECRET_BYTES,
            });
        }

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/agency_main".into());

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(ServerConfig {
            database_url,
            jwt_secret,
            token_ttl_hours: env_parse("TOKEN_TTL_HOURS", 24)?,
            pool: PoolSettings {
                max_connections: env_parse("POOL_MAX_CONNECTIONS", 20)?,
                acquire_timeout: Duration::from_secs(env_parse("POOL_ACQUIRE_TIMEOUT_SECS", 10)?),
                idle_timeout: Duration::from_secs(env_parse("POOL_IDLE_TIMEOUT_SECS", 300)?),
                statement_timeout: Duration::from_secs(env_parse(
                    "POOL_STATEMENT_TIMEOUT_SECS",
                    30,
                )?),
            },
            shutdown_timeout: Duration::from_secs(env_parse("SHUTDOWN_TIMEOUT_SECS", 15)?),
            allowed_origins,
            rate_limit_enabled: env_parse("RATE_LIMIT_ENABLED", true)?,
            rate_limit_per_minute: env_parse("RATE_LIMIT_PER_MINUTE", 300)?,
            rate_limit_burst: env_parse("RATE_LIMIT_BURST", 50)?,
            body_limit_bytes: env_parse("BODY_LIMIT_BYTES", 1_048_576)?,
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into()),
        })
    }
}

fn env_parse<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidVar {
            var,
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
