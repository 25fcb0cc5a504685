use super::state::SymbolState;
use crate::error::ValidationError;
use chrono::{DateTime, Duration, Utc};

/// Outcome of comparing a sample against its symbol's baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Detection {
    Within { change_percent: f64 },
    Breach { change_percent: f64 },
}

impl Detection {
    pub fn change_percent(&self) -> f64 {
        match *self {
            Detection::Within { change_percent } | Detection::Breach { change_percent } => {
                change_percent
            }
        }
    }

    pub fn is_breach(&self) -> bool {
        matches!(self, Detection::Breach { .. })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChangeDetector {
    threshold_percent: f64,
    window: Duration,
}

impl ChangeDetector {
    pub fn new(threshold_percent: f64, window_ms: u64) -> Self {
        Self {
            threshold_percent,
            window: Duration::milliseconds(window_ms.min(i64::MAX as u64) as i64),
        }
    }

    pub fn threshold_percent(&self) -> f64 {
        self.threshold_percent
    }

    /// Re-baseline from the last observed price when the window has run out.
    /// Returns true if the baseline moved.
    pub fn roll_window(&self, state: &mut SymbolState, now: DateTime<Utc>) -> bool {
        if now.signed_duration_since(state.baseline_time) >= self.window {
            let last = state.last_price;
            state.rebaseline(last, now);
            return true;
        }
        false
    }

    /// Apply a sample to `state` and classify it.
    ///
    /// The window is rolled before the new price is recorded, so an expired
    /// baseline is replaced by the previous observation, never by `price`.
    pub fn detect(
        &self,
        state: &mut SymbolState,
        price: f64,
        now: DateTime<Utc>,
    ) -> Result<Detection, ValidationError> {
        self.roll_window(state, now);

        state.last_price = price;
        state.last_seen = now;

        let change_percent = percent_change(state.baseline_price, price)?;
        // Alerts report the 2dp figure, which must itself reach the threshold
        if change_percent.abs() < self.threshold_percent
            || round_change(change_percent).abs() < self.threshold_percent
        {
            Ok(Detection::Within { change_percent })
        } else {
            Ok(Detection::Breach { change_percent })
        }
    }
}

/// Percent change as reported in alerts: two decimals, half away from zero.
pub fn round_change(change_percent: f64) -> f64 {
    (change_percent * 100.0).round() / 100.0
}

pub fn percent_change(base: f64, price: f64) -> Result<f64, ValidationError> {
    if !base.is_finite() || base <= 0.0 {
        return Err(ValidationError::InvalidBaseline(base));
    }
    Ok((price - base) / base * 100.0)
}
