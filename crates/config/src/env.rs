use rolo_common::error::{RoloError, RoloResult};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub log_level: String,
    /// Bootstrap lookback for a first mailbox sync, in days.
    pub mailbox_lookback_days: u32,
    /// Bootstrap lookback for a first calendar sync, in days.
    pub calendar_lookback_days: u32,
    /// Bootstrap lookback for a first directory sync, in days.
    pub directory_lookback_days: u32,
    /// To+Cc recipient count above which a message is treated as a broadcast.
    pub broadcast_recipient_limit: usize,
    /// Upper bound on the fire-and-forget outbound push task, in seconds.
    pub outbound_push_timeout_secs: u64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    /// Loads `.env` file if present, then reads required vars.
    pub fn from_env() -> RoloResult<Self> {
        // Best-effort .env load; ignore if missing
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: get_var("DATABASE_URL")?,
            log_level: get_var_or("LOG_LEVEL", "info"),
            mailbox_lookback_days: parse_var_or("MAILBOX_LOOKBACK_DAYS", 30)?,
            calendar_lookback_days: parse_var_or("CALENDAR_LOOKBACK_DAYS", 90)?,
            directory_lookback_days: parse_var_or("DIRECTORY_LOOKBACK_DAYS", 365)?,
            broadcast_recipient_limit: parse_var_or("BROADCAST_RECIPIENT_LIMIT", 4)?,
            outbound_push_timeout_secs: parse_var_or("OUTBOUND_PUSH_TIMEOUT_SECS", 10)?,
        })
    }
}

fn get_var(key: &str) -> RoloResult<String> {
    env::var(key).map_err(|_| RoloError::Config(format!("{key} is required but not set")))
}

fn get_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_var_or<T: std::str::FromStr>(key: &str, default: T) -> RoloResult<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| RoloError::Config(format!("invalid {key}: {e}"))),
        Err(_) => Ok(default),
    }
}
