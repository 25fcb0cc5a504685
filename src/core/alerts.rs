use super::detector::round_change;
use super::state::CooldownState;
use chrono::{DateTime, Duration, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    pub fn from_change(change_percent: f64) -> Self {
        if change_percent > 0.0 {
            Direction::Increase
        } else {
            Direction::Decrease
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Increase => "increase",
            Direction::Decrease => "decrease",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A threshold breach, handed to the notifier by value.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub symbol: String,
    /// Signed, rounded to two decimals
    pub change_percent: f64,
    pub current_price: f64,
    pub base_price: f64,
    pub direction: Direction,
    pub base_time: DateTime<Utc>,
    pub current_time: DateTime<Utc>,
}

impl Alert {
    pub fn new(
        symbol: &str,
        change_percent: f64,
        current_price: f64,
        current_time: DateTime<Utc>,
        base_price: f64,
        base_time: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            change_percent: round_change(change_percent),
            current_price,
            base_price,
            direction: Direction::from_change(change_percent),
            base_time,
            current_time,
        }
    }

    pub fn formatted_change(&self) -> String {
        format!("{:+.2}", self.change_percent)
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ALERT: {} {} {}% (price: {}, base: {})",
            self.symbol,
            self.direction,
            self.formatted_change(),
            self.current_price,
            self.base_price
        )
    }
}

/// Per-symbol cooldown between consecutive alerts.
#[derive(Debug, Clone, Copy)]
pub struct AlertGate {
    cooldown: Duration,
}

impl AlertGate {
    pub fn new(cooldown_ms: u64) -> Self {
        Self {
            cooldown: Duration::milliseconds(cooldown_ms.min(i64::MAX as u64) as i64),
        }
    }

    pub fn is_open(&self, state: &CooldownState, now: DateTime<Utc>) -> bool {
        match state.last_alert_time {
            Some(last) => now.signed_duration_since(last) >= self.cooldown,
            None => true,
        }
    }

    /// Claim the gate for an alert at `now`. Returns false while cooling down.
    pub fn try_acquire(&self, state: &mut CooldownState, now: DateTime<Utc>) -> bool {
        if !self.is_open(state, now) {
            return false;
        }
        state.last_alert_time = Some(now);
        true
    }
}
