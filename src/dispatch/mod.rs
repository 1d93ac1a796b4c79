//! Alert dispatch
//!
//! Matches become [`AlertEvent`](crate::model::AlertEvent)s with fresh ids and
//! leave the engine through a bounded, drop-when-full channel.

mod dispatcher;
pub mod templates;
mod types;

pub use dispatcher::{AlertDispatcher, DEFAULT_ANALYSIS_TIMEOUT};
pub use types::{AlertStream, DispatchOutcome, DispatchSnapshot, DispatchStats};
