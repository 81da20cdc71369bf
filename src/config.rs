//! Server configuration parsed from environment variables.
//!
//! Every key has a default except `DATABASE_URL`, whose absence switches the
//! service onto the bundled fixture collections. Unparseable tuning values
//! fall back to their defaults; an unparseable `PORT` or an impossible page
//! size range is rejected.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_MAX_PAGE_SIZE: usize = 200;
pub const DEFAULT_MAX_SESSIONS: usize = 1024;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 900;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Limits and defaults applied to every view session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewConfig {
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub max_sessions: usize,
    pub idle_timeout: Duration,
    pub sweep_interval: Duration,
    /// Upper bound on one source fetch (open, query or refresh).
    pub fetch_timeout: Duration,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_sessions: DEFAULT_MAX_SESSIONS,
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl ViewConfig {
    /// Clamp a requested page size into `[1, max_page_size]`.
    #[must_use]
    pub fn clamp_page_size(&self, requested: usize) -> usize {
        requested.clamp(1, self.max_page_size.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub views: ViewConfig,
}

impl ServerConfig {
    /// Build typed server config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `DATABASE_URL`: fixtures are served when absent
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `VIEW_DEFAULT_PAGE_SIZE`: default 10
    /// - `VIEW_MAX_PAGE_SIZE`: default 200
    /// - `VIEW_MAX_SESSIONS`: default 1024 per dataset
    /// - `VIEW_IDLE_TIMEOUT_SECS`: default 900
    /// - `VIEW_SWEEP_INTERVAL_SECS`: default 60
    /// - `VIEW_FETCH_TIMEOUT_SECS`: default 30
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a malformed `PORT`, or when the
    /// default page size is zero or larger than the maximum.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid { key: "PORT", value: raw })?,
            Err(_) => DEFAULT_PORT,
        };
        let database_url = std::env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());

        let views = ViewConfig {
            default_page_size: env_parse("VIEW_DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE),
            max_page_size: env_parse("VIEW_MAX_PAGE_SIZE", DEFAULT_MAX_PAGE_SIZE),
            max_sessions: env_parse("VIEW_MAX_SESSIONS", DEFAULT_MAX_SESSIONS),
            idle_timeout: Duration::from_secs(env_parse("VIEW_IDLE_TIMEOUT_SECS", DEFAULT_IDLE_TIMEOUT_SECS)),
            sweep_interval: Duration::from_secs(env_parse("VIEW_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS).max(1)),
            fetch_timeout: Duration::from_secs(env_parse("VIEW_FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS).max(1)),
        };
        if views.default_page_size == 0 || views.default_page_size > views.max_page_size {
            return Err(ConfigError::Invalid {
                key: "VIEW_DEFAULT_PAGE_SIZE",
                value: format!("{} (max {})", views.default_page_size, views.max_page_size),
            });
        }

        Ok(Self {
            port,
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            views,
        })
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
