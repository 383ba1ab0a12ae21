//! The three downstream sinks: key/value store, MQTT republish, and
//! WebSocket broadcaster. Each is independently optional, matching §4.6 —
//! a bridge with no store URL configured simply skips that sink.

pub mod mqtt;
pub mod store;
pub mod websocket;

pub use mqtt::MqttSink;
pub use store::StoreSink;
pub use websocket::{Frame, WebsocketSink};

/// The fan-out stage's handle to whichever sinks are configured.
#[derive(Default)]
pub struct Sinks {
    pub store: Option<StoreSink>,
    pub mqtt: Option<MqttSink>,
    pub websocket: Option<WebsocketSink>,
}
