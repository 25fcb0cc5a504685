use crate::api::binance::{BINANCE_FUTURES_REST_URL, BINANCE_FUTURES_WS_URL};
use crate::api::reconnect::Backoff;
use crate::core::monitor::MonitorSettings;
use crate::error::ConfigError;
use log::info;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_THRESHOLD_PERCENT: f64 = 2.0;
pub const DEFAULT_TIME_WINDOW_MS: u64 = 5_000;
pub const DEFAULT_COOLDOWN_MS: u64 = 10_000;
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3_000;
pub const DEFAULT_RECONNECT_MAX_DELAY_MS: u64 = 60_000;
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub threshold_percent: f64,
    pub time_window_ms: u64,
    pub cooldown_ms: u64,
    pub reconnect_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,
    pub heartbeat_interval_secs: u64,
    pub rest_url: String,
    pub ws_url: String,
    pub telegram: Option<TelegramConfig>,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold_percent: DEFAULT_THRESHOLD_PERCENT,
            time_window_ms: DEFAULT_TIME_WINDOW_MS,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            reconnect_max_delay_ms: DEFAULT_RECONNECT_MAX_DELAY_MS,
            heartbeat_interval_secs: DEFAULT_HEARTBEAT_INTERVAL_SECS,
            rest_url: BINANCE_FUTURES_REST_URL.to_string(),
            ws_url: BINANCE_FUTURES_WS_URL.to_string(),
            telegram: None,
            debug: false,
        }
    }
}

impl Config {
    /// Load configuration from `.env` and the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // Don't fail if .env doesn't exist
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let telegram = match (
            non_empty(lookup("TELEGRAM_BOT_TOKEN")),
            non_empty(lookup("TELEGRAM_CHAT_ID")),
        ) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig { bot_token, chat_id }),
            _ => None,
        };

        let config = Self {
            threshold_percent: parse_or(&lookup, "PRICE_THRESHOLD_PERCENT", defaults.threshold_percent)?,
            time_window_ms: parse_or(&lookup, "PRICE_TIME_WINDOW_MS", defaults.time_window_ms)?,
            cooldown_ms: parse_or(&lookup, "ALERT_COOLDOWN_MS", defaults.cooldown_ms)?,
            reconnect_delay_ms: parse_or(&lookup, "RECONNECT_DELAY_MS", defaults.reconnect_delay_ms)?,
            reconnect_max_delay_ms: parse_or(
                &lookup,
                "RECONNECT_MAX_DELAY_MS",
                defaults.reconnect_max_delay_ms,
            )?,
            heartbeat_interval_secs: parse_or(
                &lookup,
                "HEARTBEAT_INTERVAL_SECS",
                defaults.heartbeat_interval_secs,
            )?,
            rest_url: non_empty(lookup("BINANCE_REST_URL")).unwrap_or(defaults.rest_url),
            ws_url: non_empty(lookup("BINANCE_WS_URL")).unwrap_or(defaults.ws_url),
            telegram,
            debug: match non_empty(lookup("DEBUG")) {
                Some(raw) => parse_flag(&raw).ok_or(ConfigError::Invalid { key: "DEBUG", value: raw })?,
                None => false,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold_percent.is_finite() || self.threshold_percent <= 0.0 {
            return Err(ConfigError::OutOfRange(
                "PRICE_THRESHOLD_PERCENT must be greater than 0".to_string(),
            ));
        }
        if self.time_window_ms == 0 {
            return Err(ConfigError::OutOfRange(
                "PRICE_TIME_WINDOW_MS must be greater than 0".to_string(),
            ));
        }
        if self.reconnect_delay_ms == 0 {
            return Err(ConfigError::OutOfRange(
                "RECONNECT_DELAY_MS must be greater than 0".to_string(),
            ));
        }
        if self.reconnect_max_delay_ms < self.reconnect_delay_ms {
            return Err(ConfigError::OutOfRange(
                "RECONNECT_MAX_DELAY_MS must not be less than RECONNECT_DELAY_MS".to_string(),
            ));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::OutOfRange(
                "HEARTBEAT_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            threshold_percent: self.threshold_percent,
            time_window_ms: self.time_window_ms,
            cooldown_ms: self.cooldown_ms,
        }
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.reconnect_delay_ms),
            Duration::from_millis(self.reconnect_max_delay_ms),
        )
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  Threshold: ±{}%", self.threshold_percent);
        info!("  Time window: {}ms", self.time_window_ms);
        info!("  Alert cooldown: {}ms", self.cooldown_ms);
        info!(
            "  Reconnect backoff: {}ms .. {}ms",
            self.reconnect_delay_ms, self.reconnect_max_delay_ms
        );
        info!("  REST: {}  WS: {}", self.rest_url, self.ws_url);
        info!(
            "  Telegram: {}",
            if self.telegram.is_some() { "enabled" } else { "disabled" }
        );
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match non_empty(lookup(key)) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
