//! Game lifecycle modules.
//!
//! Covers session starts, answer parsing and arbitration, countdown and
//! timeout timers, teardown, and health monitoring.

pub mod answers;
mod cleanup;
mod engine;
mod expiry;
pub mod monitor;
pub mod notifier;
mod store;
mod timer;

pub use engine::{GameEngine, StartGame};
pub use monitor::{EngineStats, HealthReport, HealthStatus};
pub use notifier::{MessengerNotifier, NotifyOutcome, SessionNotifier};
