use super::alerts::{Alert, AlertGate};
use super::detector::{ChangeDetector, Detection};
use super::state::SymbolState;
use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::{Mutex, RwLock};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorSettings {
    pub threshold_percent: f64,
    pub time_window_ms: u64,
    pub cooldown_ms: u64,
}

type Slot = Arc<Mutex<SymbolState>>;

/// Owns every symbol's baseline and cooldown.
///
/// The table lock is only held to find or insert a symbol's slot; each slot
/// has its own mutex, so different symbols can be observed concurrently while
/// updates to one symbol are serialised.
pub struct MonitorEngine {
    detector: ChangeDetector,
    gate: AlertGate,
    symbols: RwLock<HashMap<String, Slot>>,
}

impl MonitorEngine {
    pub fn new(settings: MonitorSettings) -> Self {
        Self {
            detector: ChangeDetector::new(settings.threshold_percent, settings.time_window_ms),
            gate: AlertGate::new(settings.cooldown_ms),
            symbols: RwLock::new(HashMap::new()),
        }
    }

    /// Feed one price sample. `Ok(None)` is the normal no-alert outcome.
    pub fn observe(
        &self,
        symbol: &str,
        price: f64,
        now: DateTime<Utc>,
    ) -> Result<Option<Alert>, ValidationError> {
        if symbol.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(ValidationError::InvalidPrice(price));
        }

        let existing = self.symbols.read().get(symbol).map(Arc::clone);
        let slot = match existing {
            Some(slot) => slot,
            None => match self.symbols.write().entry(symbol.to_string()) {
                Entry::Occupied(entry) => Arc::clone(entry.get()),
                Entry::Vacant(entry) => {
                    entry.insert(Arc::new(Mutex::new(SymbolState::new(price, now))));
                    debug!("Tracking {} from {}", symbol, price);
                    return Ok(None);
                }
            },
        };

        let mut state = slot.lock();
        if now < state.last_seen {
            return Err(ValidationError::ClockWentBackwards {
                symbol: symbol.to_string(),
                last_seen: state.last_seen,
                now,
            });
        }

        let change_percent = match self.detector.detect(&mut state, price, now)? {
            Detection::Within { .. } => return Ok(None),
            Detection::Breach { change_percent } => change_percent,
        };

        if !self.gate.try_acquire(&mut state.cooldown, now) {
            debug!(
                "{} moved {:.2}% but is cooling down, alert suppressed",
                symbol, change_percent
            );
            return Ok(None);
        }

        // Still the baseline the breach was measured against (possibly just
        // rolled forward by window expiry).
        let alert = Alert::new(
            symbol,
            change_percent,
            price,
            now,
            state.baseline_price,
            state.baseline_time,
        );
        state.rebaseline(price, now);

        Ok(Some(alert))
    }

    pub fn tracked_count(&self) -> usize {
        self.symbols.read().len()
    }

    /// Copy of a symbol's current state.
    pub fn snapshot(&self, symbol: &str) -> Option<SymbolState> {
        let slot = self.symbols.read().get(symbol).map(Arc::clone)?;
        let state = *slot.lock();
        Some(state)
    }

    pub fn clear_symbol(&self, symbol: &str) -> bool {
        self.symbols.write().remove(symbol).is_some()
    }

    pub fn clear_all(&self) {
        self.symbols.write().clear();
    }

    pub fn threshold_percent(&self) -> f64 {
        self.detector.threshold_percent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Direction;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn engine() -> MonitorEngine {
        MonitorEngine::new(MonitorSettings {
            threshold_percent: 2.0,
            time_window_ms: 5_000,
            cooldown_ms: 10_000,
        })
    }

    #[test]
    fn first_sample_sets_baseline_without_alert() {
        let engine = engine();
        assert_eq!(engine.observe("X", 100.0, at(0)).unwrap(), None);

        let state = engine.snapshot("X").unwrap();
        assert_eq!(state.baseline_price, 100.0);
        assert_eq!(state.baseline_time, at(0));
        assert_eq!(state.last_price, 100.0);
        assert_eq!(engine.tracked_count(), 1);
    }

    #[test]
    fn breach_emits_alert_and_rebaselines() {
        let engine = engine();
        engine.observe("X", 100.0, at(0)).unwrap();
        assert!(engine.observe("X", 101.5, at(1_000)).unwrap().is_none());

        let alert = engine.observe("X", 103.0, at(2_000)).unwrap().unwrap();
        assert_eq!(alert.symbol, "X");
        assert_eq!(alert.direction, Direction::Increase);
        assert_eq!(alert.formatted_change(), "+3.00");
        assert_eq!(alert.base_price, 100.0);
        assert_eq!(alert.base_time, at(0));
        assert_eq!(alert.current_price, 103.0);
        assert_eq!(alert.current_time, at(2_000));

        let state = engine.snapshot("X").unwrap();
        assert_eq!(state.baseline_price, 103.0);
        assert_eq!(state.baseline_time, at(2_000));
        assert_eq!(state.cooldown.last_alert_time, Some(at(2_000)));
    }

    #[test]
    fn decrease_breach_reports_decrease() {
        let engine = engine();
        engine.observe("Y", 50.0, at(0)).unwrap();
        let alert = engine.observe("Y", 48.5, at(100)).unwrap().unwrap();
        assert_eq!(alert.direction, Direction::Decrease);
        assert_eq!(alert.change_percent, -3.0);
    }

    #[test]
    fn suppressed_breach_keeps_baseline() {
        let engine = engine();
        engine.observe("X", 100.0, at(0)).unwrap();
        engine.observe("X", 103.0, at(1_000)).unwrap().unwrap();

        // 103 -> 106 is a breach, but inside the cooldown
        assert!(engine.observe("X", 106.0, at(2_000)).unwrap().is_none());
        let state = engine.snapshot("X").unwrap();
        assert_eq!(state.baseline_price, 103.0);
        assert_eq!(state.baseline_time, at(1_000));
        assert_eq!(state.last_price, 106.0);
        assert_eq!(state.cooldown.last_alert_time, Some(at(1_000)));
    }

    #[test]
    fn alert_fires_again_after_cooldown_against_new_baseline() {
        let engine = MonitorEngine::new(MonitorSettings {
            threshold_percent: 2.0,
            time_window_ms: 60_000,
            cooldown_ms: 10_000,
        });
        engine.observe("X", 100.0, at(0)).unwrap();
        engine.observe("X", 103.0, at(1_000)).unwrap().unwrap();
        assert!(engine.observe("X", 99.0, at(5_000)).unwrap().is_none());

        let alert = engine.observe("X", 99.0, at(11_000)).unwrap().unwrap();
        assert_eq!(alert.base_price, 103.0);
        assert_eq!(alert.base_time, at(1_000));
        assert_eq!(alert.direction, Direction::Decrease);
    }

    #[test]
    fn breach_after_window_roll_reports_rolled_baseline() {
        let engine = engine();
        engine.observe("X", 100.0, at(0)).unwrap();
        engine.observe("X", 101.0, at(3_000)).unwrap();

        // Window expired: baseline moves to 101 at t=6000 before 104 is compared
        let alert = engine.observe("X", 104.0, at(6_000)).unwrap().unwrap();
        assert_eq!(alert.base_price, 101.0);
        assert_eq!(alert.base_time, at(6_000));
        assert_eq!(alert.change_percent, 2.97);
    }

    #[test]
    fn rejects_invalid_input() {
        let engine = engine();
        assert_eq!(
            engine.observe("", 1.0, at(0)),
            Err(ValidationError::EmptySymbol)
        );
        assert_eq!(
            engine.observe("X", 0.0, at(0)),
            Err(ValidationError::InvalidPrice(0.0))
        );
        assert!(engine.observe("X", -1.0, at(0)).is_err());
        assert!(engine.observe("X", f64::INFINITY, at(0)).is_err());
        assert_eq!(engine.tracked_count(), 0);

        engine.observe("X", 10.0, at(5_000)).unwrap();
        assert!(matches!(
            engine.observe("X", 10.0, at(4_000)),
            Err(ValidationError::ClockWentBackwards { .. })
        ));
        // Rejected sample leaves state untouched
        assert_eq!(engine.snapshot("X").unwrap().last_seen, at(5_000));
    }

    #[test]
    fn clear_forgets_symbols() {
        let engine = engine();
        engine.observe("A", 1.0, at(0)).unwrap();
        engine.observe("B", 2.0, at(0)).unwrap();
        assert!(engine.clear_symbol("A"));
        assert!(!engine.clear_symbol("A"));
        assert_eq!(engine.tracked_count(), 1);

        // A starts over: the next sample is a fresh baseline, not a breach
        assert!(engine.observe("A", 5.0, at(10)).unwrap().is_none());
        engine.clear_all();
        assert_eq!(engine.tracked_count(), 0);
        assert!(engine.snapshot("B").is_none());
    }

    #[test]
    fn concurrent_symbols_are_tracked_independently() {
        let engine = Arc::new(engine());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    let symbol = format!("SYM{}", i);
                    let mut alerts = 0;
                    for step in 0..100i64 {
                        let price = if step % 2 == 0 { 100.0 } else { 110.0 };
                        if engine.observe(&symbol, price, at(step)).unwrap().is_some() {
                            alerts += 1;
                        }
                    }
                    alerts
                })
            })
            .collect();

        for handle in handles {
            // Cooldown of 10s admits exactly one alert inside 100ms of samples
            assert_eq!(handle.join().unwrap(), 1);
        }
        assert_eq!(engine.tracked_count(), 8);
    }

    #[test]
    fn racing_breaches_on_one_symbol_alert_once() {
        let engine = Arc::new(engine());
        engine.observe("X", 100.0, at(0)).unwrap();

        let barrier = Arc::new(std::sync::Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    (0..50)
                        .filter_map(|_| engine.observe("X", 110.0, at(1_000)).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let alerts: Vec<Alert> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].base_price, 100.0);
        assert_eq!(alerts[0].change_percent, 10.0);

        let state = engine.snapshot("X").unwrap();
        assert_eq!(state.baseline_price, 110.0);
        assert_eq!(state.baseline_time, at(1_000));
        assert_eq!(state.last_price, 110.0);
        assert_eq!(state.last_seen, at(1_000));
        assert_eq!(state.cooldown.last_alert_time, Some(at(1_000)));
        assert_eq!(engine.tracked_count(), 1);
    }

    #[test]
    fn racing_first_samples_create_one_baseline() {
        let engine = Arc::new(engine());
        let barrier = Arc::new(std::sync::Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    engine.observe("FRESH", 50.0, at(0)).unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().is_none());
        }
        assert_eq!(engine.tracked_count(), 1);
        let state = engine.snapshot("FRESH").unwrap();
        assert_eq!(state.baseline_price, 50.0);
        assert_eq!(state.cooldown.last_alert_time, None);
    }
}
