use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PriceWatchError {
    #[error("WebSocket error: {0}")]
    WebsocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Invalid sample: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Symbol discovery failed: {0}")]
    DiscoveryError(String),

    #[error("Malformed ticker message: {0}")]
    MalformedMessage(String),

    #[error("No symbols to subscribe to")]
    NoSymbols,
}

/// Rejected input to the monitor engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("symbol must not be empty")]
    EmptySymbol,

    #[error("price must be a positive finite number, got {0}")]
    InvalidPrice(f64),

    #[error("baseline price must be positive, got {0}")]
    InvalidBaseline(f64),

    #[error("clock went backwards for {symbol}: last sample at {last_seen}, now {now}")]
    ClockWentBackwards {
        symbol: String,
        last_seen: DateTime<Utc>,
        now: DateTime<Utc>,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("{0}")]
    OutOfRange(String),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint rejected message ({status}): {description}")]
    Rejected { status: u16, description: String },
}
