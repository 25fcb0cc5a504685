//! Multi-symbol price movement monitor.
//!
//! A [`StreamSource`](api::binance::StreamSource) feeds ticker samples into a
//! [`MonitorEngine`](core::MonitorEngine), which raises rate-limited
//! [`Alert`](core::Alert)s when a symbol moves past a percentage threshold
//! inside a rolling window. Alerts are delivered through a
//! [`Notifier`](notify::Notifier).

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod notify;
