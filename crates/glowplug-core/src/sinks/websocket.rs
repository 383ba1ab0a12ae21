//! WebSocket broadcaster sink: a single bounded `tokio::sync::broadcast`
//! channel feeding every subscribed dashboard connection.
//!
//! Grounded on the forwarder's `local_fanout.rs` broadcast-registry idiom.
//! A `broadcast` channel's fixed ring buffer gives the drop-oldest overflow
//! policy directly: a lagging receiver's next `recv()` returns
//! `Lagged(n)` rather than blocking the sender, so a slow dashboard loses
//! its oldest unread frames instead of stalling the whole pipeline. Per-
//! connection "start" gating and liveness pings live in the HTTP layer,
//! which owns the upgraded socket.

use serde_json::Value as Json;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 1000;

/// One metric update, as broadcast to subscribed dashboards.
#[derive(Debug, Clone)]
pub struct Frame {
    pub topic: String,
    pub alias: u64,
    pub name: String,
    pub value: Json,
    pub timestamp: u64,
}

#[derive(Clone)]
pub struct WebsocketSink {
    tx: broadcast::Sender<Frame>,
    // Kept alive, never read: `broadcast::Sender::send` only buffers into the
    // ring when at least one receiver is live, so without this handle every
    // frame pushed before the first dashboard connects would be dropped
    // outright instead of queued up to `CHANNEL_CAPACITY`.
    _retained_rx: std::sync::Arc<broadcast::Receiver<Frame>>,
}

impl Default for WebsocketSink {
    fn default() -> Self {
        Self::new()
    }
}

impl WebsocketSink {
    pub fn new() -> Self {
        let (tx, rx) = broadcast::channel(CHANNEL_CAPACITY);
        WebsocketSink {
            tx,
            _retained_rx: std::sync::Arc::new(rx),
        }
    }

    /// Broadcasts a frame. Succeeds silently with zero subscribers, matching
    /// `broadcast::Sender::send`'s only failure mode.
    pub fn push(&self, frame: Frame) {
        let _ = self.tx.send(frame);
    }

    /// Hands the HTTP layer a fresh receiver for one upgraded connection.
    pub fn subscribe(&self) -> broadcast::Receiver<Frame> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_with_no_subscribers_does_not_panic() {
        let sink = WebsocketSink::new();
        sink.push(Frame {
            topic: "t".into(),
            alias: 0,
            name: "m".into(),
            value: Json::Null,
            timestamp: 0,
        });
    }

    #[tokio::test]
    async fn subscriber_receives_pushed_frame() {
        let sink = WebsocketSink::new();
        let mut rx = sink.subscribe();
        sink.push(Frame {
            topic: "t".into(),
            alias: 1,
            name: "m".into(),
            value: Json::from(42),
            timestamp: 1,
        });
        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.name, "m");
        assert_eq!(frame.value, Json::from(42));
    }

    #[tokio::test]
    async fn slow_subscriber_lags_instead_of_blocking_sender() {
        let sink = WebsocketSink::new();
        let mut rx = sink.subscribe();
        for i in 0..(CHANNEL_CAPACITY + 10) {
            sink.push(Frame {
                topic: "t".into(),
                alias: 0,
                name: format!("m{i}"),
                value: Json::Null,
                timestamp: i as u64,
            });
        }
        let err = rx.try_recv().unwrap_err();
        assert!(matches!(err, broadcast::error::TryRecvError::Lagged(_)));
    }
}
