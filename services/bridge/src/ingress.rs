//! MQTT ingress: subscribes `spBv1.0/#`, converts inbound publishes into
//! `glowplug_core::Message`s, and hands them to the worker pool.
//!
//! Grounded on the eg4-bridge `mqtt.rs` receiver idiom (`AsyncClient`,
//! `EventLoop::poll` under a timeout, dispatch on `Incoming::Publish`) and
//! the source's `glowplug.go` `msgHandler` callback.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use glowplug_core::{Message, WorkerPool};
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{Error, Result};

const SPARKPLUG_WILDCARD: &str = "spBv1.0/#";
const POLL_TIMEOUT: Duration = Duration::from_secs(1);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const KEEP_ALIVE: Duration = Duration::from_secs(2);
const MIN_HOST_LEN: usize = 4;

/// A per-process-unique MQTT client ID, `glowplug-<nanotime>`, per §6 — two
/// bridges (or this bridge's ingress and publish connections) must never
/// collide on the broker.
pub(crate) fn mqtt_client_id() -> String {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    format!("glowplug-{nanos}")
}

/// Connects to `broker_url` and feeds decoded publishes into `pool` until
/// `cancel` fires. Runs on the caller's task — the service spawns it.
pub async fn run(broker_url: &str, pool: Arc<WorkerPool>, cancel: CancellationToken) -> Result<()> {
    let (host, port) = parse_broker_url(broker_url)?;
    let mut options = MqttOptions::new(mqtt_client_id(), host, port);
    // rumqttc ties the PINGREQ/PINGRESP timeout to keep_alive; there's no
    // separate setter, so keep_alive is the closest match to the spec's
    // "keepalive 2s, ping timeout 1s".
    options.set_keep_alive(KEEP_ALIVE);

    let (client, mut eventloop) = AsyncClient::new(options, 100);
    client
        .subscribe(SPARKPLUG_WILDCARD, QoS::AtMostOnce)
        .await
        .map_err(|e| Error::MqttConnect(e.to_string()))?;

    loop {
        if cancel.is_cancelled() {
            let _ = client.disconnect().await;
            tokio::time::sleep(Duration::from_millis(250)).await;
            return Ok(());
        }

        match tokio::time::timeout(POLL_TIMEOUT, eventloop.poll()).await {
            Ok(Ok(Event::Incoming(Incoming::Publish(publish)))) => {
                let msg = Message {
                    topic: publish.topic,
                    payload: publish.payload.to_vec(),
                };
                if pool.add_message(msg).is_err() {
                    warn!(capacity = ?pool.capacity(), "dropping message, worker pool full");
                }
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                warn!(error = %e, "mqtt connection error, reconnecting");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
            Err(_) => {}
        }
    }
}

/// Parses `<scheme>://host:port` (and bare `host:port`) into `(host, port)`.
/// A full URL crate is overkill for the handful of schemes this bridge
/// speaks. Shared with `service.rs`, which parses the publish-broker URL the
/// same way. Per §6: schemes `mqtt`/`tcp`/`ssl`/`ws`, host at least
/// `MIN_HOST_LEN` characters, port required (no default).
pub(crate) fn parse_broker_url(url: &str) -> Result<(String, u16)> {
    let without_scheme = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .or_else(|| url.strip_prefix("ssl://"))
        .or_else(|| url.strip_prefix("ws://"))
        .ok_or_else(|| Error::Config(format!("mqtt url missing mqtt/tcp/ssl/ws scheme: {url}")))?;
    if without_scheme.is_empty() || without_scheme.contains(char::is_whitespace) {
        return Err(Error::Config(format!("mqtt url missing host: {url}")));
    }

    let (host, port_str) = without_scheme
        .rsplit_once(':')
        .ok_or_else(|| Error::Config(format!("mqtt url missing port: {url}")))?;
    let port = port_str
        .parse::<u16>()
        .map_err(|_| Error::Config(format!("invalid mqtt port in url: {url}")))?;

    if host.len() < MIN_HOST_LEN {
        return Err(Error::Config(format!("mqtt url host too short: {url}")));
    }

    info!(host, port, "mqtt broker resolved");
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_explicit_port() {
        let (host, port) = parse_broker_url("mqtt://localhost:1884").unwrap();
        assert_eq!(host, "localhost");
        assert_eq!(port, 1884);
    }

    #[test]
    fn missing_port_is_fatal() {
        assert!(parse_broker_url("mqtt://broker.example.com").is_err());
    }

    #[test]
    fn accepts_every_spec_scheme() {
        for scheme in ["mqtt", "tcp", "ssl", "ws"] {
            let (host, port) = parse_broker_url(&format!("{scheme}://broker.example.com:1883")).unwrap();
            assert_eq!(host, "broker.example.com");
            assert_eq!(port, 1883);
        }
    }

    #[test]
    fn rejects_too_short_host() {
        assert!(parse_broker_url("mqtt://a:1883").is_err());
    }

    #[test]
    fn client_ids_are_unique_per_call() {
        assert_ne!(mqtt_client_id(), mqtt_client_id());
    }

    #[test]
    fn rejects_malformed_url() {
        assert!(parse_broker_url("not a url").is_err());
    }
}
