use chrono::{DateTime, Utc};

/// Last alert emitted for a symbol, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CooldownState {
    pub last_alert_time: Option<DateTime<Utc>>,
}

/// Rolling baseline for one symbol.
///
/// `baseline_time <= last_seen` holds at all times; `last_price` is the most
/// recent accepted sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolState {
    pub baseline_price: f64,
    pub baseline_time: DateTime<Utc>,
    pub last_price: f64,
    pub last_seen: DateTime<Utc>,
    pub cooldown: CooldownState,
}

impl SymbolState {
    pub fn new(price: f64, now: DateTime<Utc>) -> Self {
        Self {
            baseline_price: price,
            baseline_time: now,
            last_price: price,
            last_seen: now,
            cooldown: CooldownState::default(),
        }
    }

    pub fn rebaseline(&mut self, price: f64, now: DateTime<Utc>) {
        self.baseline_price = price;
        self.baseline_time = now;
    }
}
