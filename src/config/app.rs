// src/config/app.rs
//! Process-level settings read from the environment (after `.env`).
use std::env;
use std::time::Duration;

pub const DEFAULT_WEATHER_LOCATION: &str = "Newcastle upon Tyne,UK";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Fallback display name when the messaging gateway does not provide one.
    pub user_name: Option<String>,
    pub telegram_token: Option<String>,
    pub openweathermap_api_key: Option<String>,
    pub weather_location: String,
    pub adapter_timeout: Duration,
    pub poll_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_name: None,
            telegram_token: None,
            openweathermap_api_key: None,
            weather_location: DEFAULT_WEATHER_LOCATION.to_string(),
            adapter_timeout: crate::ingest::DEFAULT_ADAPTER_TIMEOUT,
            poll_timeout_secs: 30,
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_u64(key: &str) -> Option<u64> {
    non_empty(key).and_then(|v| v.parse::<u64>().ok())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let d = AppConfig::default();
        Self {
            user_name: non_empty("USER_NAME"),
            telegram_token: non_empty("TELEGRAM_TOKEN"),
            openweathermap_api_key: non_empty("OPENWEATHERMAP_API_KEY"),
            weather_location: non_empty("WEATHER_LOCATION").unwrap_or(d.weather_location),
            adapter_timeout: parse_u64("ADAPTER_TIMEOUT_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(d.adapter_timeout),
            poll_timeout_secs: parse_u64("TELEGRAM_POLL_TIMEOUT_SECS").unwrap_or(d.poll_timeout_secs),
        }
    }
}
