//! Monitoring loop
//!
//! Ties the registry, evaluator and dispatcher together: a periodic sweep
//! over every active subscription (pull) plus immediate handling of pushed
//! news (push).

mod monitor;
mod types;

pub use monitor::MonitorEngine;
pub use types::{EngineConfig, EngineError, SweepReport};
