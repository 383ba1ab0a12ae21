//! The bounded worker pool, first-seen registry, and downstream sinks that
//! sit between Sparkplug decode and the store/MQTT/WebSocket fan-out.

pub mod error;
pub mod sinks;
pub mod worker;

pub use error::{Error, Result};
pub use sinks::Sinks;
pub use worker::{Message, WorkerPool};
