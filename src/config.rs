use std::{env, net::IpAddr, str::FromStr, time::Duration};

use log::{info, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub session_ttl: Duration,
    pub weather_api_key: String,
    pub weather_url: String,
    pub public_base_url: String,
    pub smtp: SmtpConfig,
}

impl Config {
    /// Loads the process configuration, reading a `.env` file first when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        if dotenvy::dotenv().is_ok() {
            info!("loaded .env file");
        }

        Ok(Config {
            bind_addr: parse_or("BIND_ADDR", "127.0.0.1")?,
            port: parse_or("PORT", "3000")?,
            database_url: var_or("DATABASE_URL", "sqlite://weather_app.db?mode=rwc"),
            jwt_secret: required("JWT_SECRET")?,
            session_ttl: duration_or("SESSION_TTL", "1h")?,
            weather_api_key: required("OPENWEATHERMAP_API_KEY")?,
            weather_url: var_or(
                "OPENWEATHERMAP_URL",
                "https://api.openweathermap.org/data/2.5/weather",
            ),
            public_base_url: var_or("PUBLIC_BASE_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_owned(),
            smtp: SmtpConfig {
                host: var_or("SMTP_HOST", ""),
                port: parse_or("SMTP_PORT", "587")?,
                username: env::var("SMTP_USERNAME").ok(),
                password: env::var("SMTP_PASSWORD").ok(),
                from: var_or("SMTP_FROM", "no-reply@localhost"),
            },
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn var_or(key: &'static str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        if !default.is_empty() {
            info!("{} not set, using default: {}", key, default);
        }
        default.to_owned()
    })
}

fn parse_or<T>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var_or(key, default).parse().map_err(|e: T::Err| {
        warn!("invalid {} value", key);
        ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }
    })
}

fn duration_or(key: &'static str, default: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(&var_or(key, default)).map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}
