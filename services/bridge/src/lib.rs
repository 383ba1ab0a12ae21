//! Sparkplug B ingestion bridge: MQTT ingress, Redis/MQTT/WebSocket fan-out,
//! an embedded dashboard, and a best-effort OPC UA client.

use std::time::Duration;

pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod ingress;
pub mod opcua;
pub mod service;
pub mod version;
pub mod ws;

pub use error::{Error, Result};
pub use service::{AppState, Service};

/// How long `Service::stop` waits after cancelling every task for the MQTT
/// client to flush its disconnect and the HTTP listener to drain.
pub(crate) const STOP_DRAIN: Duration = Duration::from_millis(250);
