use chrono::{DateTime, Utc};

/// One price observation taken off the ticker feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub symbol: String,
    pub price: f64,
    pub received_at: DateTime<Utc>,
}

impl Sample {
    pub fn new(symbol: impl Into<String>, price: f64, received_at: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            received_at,
        }
    }
}
