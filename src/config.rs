//! Server configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_ENTITY_FLUSH_INTERVAL_MS: u64 = 250;
pub const DEFAULT_WORKSPACE_IDLE_TTL_MS: u64 = 600_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub flush_interval: Duration,
    pub workspace_idle_ttl: Duration,
}

impl ServerConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `DATABASE_URL`
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `ENTITY_FLUSH_INTERVAL_MS`: default 250
    /// - `WORKSPACE_IDLE_TTL_MS`: default 600000 (10 minutes)
    ///
    /// # Errors
    ///
    /// Returns `Missing` when `DATABASE_URL` is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        Ok(Self {
            database_url,
            port: env_parse("PORT", DEFAULT_PORT),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            flush_interval: Duration::from_millis(env_parse(
                "ENTITY_FLUSH_INTERVAL_MS",
                DEFAULT_ENTITY_FLUSH_INTERVAL_MS,
            )),
            workspace_idle_ttl: Duration::from_millis(env_parse(
                "WORKSPACE_IDLE_TTL_MS",
                DEFAULT_WORKSPACE_IDLE_TTL_MS,
            )),
        })
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
