//! Runtime configuration, read once from the environment at startup.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;
use thiserror::Error;

use crate::db::DbConfig;

/// Sessions expire this long after login, regardless of activity.
pub const SESSION_LIFETIME_HOURS: i64 = 24;

const MIN_PRODUCTION_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub session_secret: String,
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub static_dir: PathBuf,
    pub session_lifetime: Duration,
    pub db: DbConfig,
}

impl Config {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let session_secret = var("SESSION_SECRET").ok_or(ConfigError::Missing("SESSION_SECRET"))?;
        let db = DbConfig::from_lookup(&lookup)?;
        let environment = var("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        if environment == "production" && session_secret.len() < MIN_PRODUCTION_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: "SESSION_SECRET",
                reason: format!(
                    "must be at least {} bytes in production",
                    MIN_PRODUCTION_SECRET_LEN
                ),
            });
        }

        let port = match var("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                reason: format!("'{}' is not a valid port", raw),
            })?,
            None => 5000,
        };

        Ok(Self {
            session_secret,
            environment,
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            upload_dir: var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            static_dir: var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
            session_lifetime: Duration::hours(SESSION_LIFETIME_HOURS),
            db,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl DbConfig {
    /// Database settings alone, for tools that never serve requests.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|name: &str| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let url = var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            url,
            max_connections: parse_or(&var, "DB_POOL_MAX", 10),
            min_connections: parse_or(&var, "DB_POOL_MIN", 2),
            connect_timeout_secs: parse_or(&var, "DB_CONNECT_TIMEOUT", 10),
            idle_timeout_secs: parse_or(&var, "DB_IDLE_TIMEOUT", 300),
        })
    }
}

/// Tuning knob with a fallback. Values that do not fit `T` fall back too.
fn parse_or<T, V>(var: &V, name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    V: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring {}={:?}, using {}", name, raw, default);
            default
        }),
        None => default,
    }
}
