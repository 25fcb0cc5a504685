//! Stream analysis core: per-symbol baselines, change detection and the
//! alert cooldown gate. Nothing in here performs I/O.

pub mod alerts;
pub mod detector;
pub mod monitor;
pub mod sample;
pub mod state;

pub use alerts::{Alert, AlertGate, Direction};
pub use detector::{ChangeDetector, Detection};
pub use monitor::{MonitorEngine, MonitorSettings};
pub use sample::Sample;
pub use state::{CooldownState, SymbolState};
