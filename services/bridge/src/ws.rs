//! The dashboard WebSocket: clients must send the literal text frame
//! `start` before they receive any broadcast frames (a hard gate — see
//! `DESIGN.md`'s Open Question resolutions). Binary frames are rejected.
//! A periodic ping reaps connections whose peer has gone silently away.
//!
//! Grounded on `ws_common.rs`'s helper-function decomposition (text-frame
//! protocol handling, timeout-style receive loop) and `local_fanout.rs`'s
//! `RecvError::Lagged`/`Closed` handling, adapted from a TCP-framed push
//! registry to an axum WebSocket fed by a `broadcast::Receiver<Frame>`.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use glowplug_core::sinks::Frame;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;

use crate::AppState;

const START_COMMAND: &str = "start";
const PING_INTERVAL: Duration = Duration::from_secs(30);

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

#[derive(Serialize)]
struct FrameJson<'a> {
    topic: &'a str,
    name: &'a str,
    alias: u64,
    value: &'a serde_json::Value,
    timestamp: u64,
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut subscribed: Option<broadcast::Receiver<Frame>> = None;
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await; // first tick fires immediately; skip it

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        if text.trim() == START_COMMAND {
                            if subscribed.is_none() {
                                subscribed = Some(state.websocket_sink().subscribe());
                            }
                        } else if socket
                            .send(WsMessage::Text("You did not say the magic word!".into()))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Binary(_))) => {
                        let _ = socket
                            .send(WsMessage::Text("binary frames are not supported".into()))
                            .await;
                        break;
                    }
                    Some(Ok(WsMessage::Close(_))) => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket receive error");
                        break;
                    }
                    None => break,
                }
            }
            frame = async { subscribed.as_mut().unwrap().recv().await }, if subscribed.is_some() => {
                match frame {
                    Ok(f) => {
                        let json = serde_json::to_string(&FrameJson {
                            topic: &f.topic,
                            name: &f.name,
                            alias: f.alias,
                            value: &f.value,
                            timestamp: f.timestamp,
                        })
                        .unwrap_or_default();
                        if socket.send(WsMessage::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "websocket client lagging, dropped oldest frames");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = ping_interval.tick() => {
                if socket.send(WsMessage::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }
}
