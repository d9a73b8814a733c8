//! Process configuration, read once from the environment at startup.

use std::{env, fmt::Display, net::SocketAddr, str::FromStr};

use chrono::Duration;
use thiserror::Error;
use tracing::{info, warn};

use storefront_auth::LockoutPolicy;
use storefront_infra::stock_service::DEFAULT_MAX_ATTEMPTS;
use storefront_observability::LogFormat;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set when USE_PERSISTENT_STORES is enabled")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub use_persistent_stores: bool,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub admin_email: Option<String>,
    pub admin_password_hash: Option<String>,
    pub lockout: LockoutPolicy,
    pub stock_max_attempts: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| {
                warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            });

        let use_persistent_stores = try_load(&lookup, "USE_PERSISTENT_STORES", false)?;
        let database_url = non_empty(lookup("DATABASE_URL"));
        if use_persistent_stores && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let jwt_ttl_minutes: i64 = try_load(&lookup, "JWT_TTL_MINUTES", 60)?;
        let lockout_minutes: i64 = try_load(&lookup, "LOGIN_LOCKOUT_MINUTES", 15)?;

        Ok(Self {
            bind_addr: try_load(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            jwt_secret,
            jwt_ttl: positive_minutes("JWT_TTL_MINUTES", jwt_ttl_minutes)?,
            use_persistent_stores,
            database_url,
            database_max_connections: at_least_one(
                "DATABASE_MAX_CONNECTIONS",
                try_load(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            )?,
            admin_email: non_empty(lookup("ADMIN_EMAIL")),
            admin_password_hash: non_empty(lookup("ADMIN_PASSWORD_HASH")),
            lockout: LockoutPolicy {
                max_attempts: at_least_one(
                    "LOGIN_MAX_ATTEMPTS",
                    try_load(&lookup, "LOGIN_MAX_ATTEMPTS", 5)?,
                )?,
                lockout: positive_minutes("LOGIN_LOCKOUT_MINUTES", lockout_minutes)?,
            },
            stock_max_attempts: at_least_one(
                "STOCK_MAX_RETRIES",
                try_load(&lookup, "STOCK_MAX_RETRIES", DEFAULT_MAX_ATTEMPTS)?,
            )?,
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

/// `LOG_FORMAT`, read before logging is up; `None` when unset.
pub fn log_format<F>(lookup: F) -> Result<Option<LogFormat>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup("LOG_FORMAT"))
        .map(|raw| {
            raw.parse::<LogFormat>().map_err(|reason| ConfigError::Invalid {
                key: "LOG_FORMAT",
                value: raw.clone(),
                reason,
            })
        })
        .transpose()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn try_load<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match non_empty(lookup(key)) {
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn at_least_one(key: &'static str, value: u32) -> Result<u32, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

fn positive_minutes(key: &'static str, minutes: i64) -> Result<Duration, ConfigError> {
    if minutes <= 0 {
        return Err(ConfigError::Invalid {
            key,
            value: minutes.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::minutes(minutes))
}
