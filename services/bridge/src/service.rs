//! Wires ingress, worker pool, sinks, and the optional HTTP/WebSocket
//! surface into one running service.
//!
//! Grounded on `original_source/service/glowplug.go`'s `Start`/`Stop` (build
//! every configured sink, launch the MQTT subscriber and worker pool, tear
//! down with a short drain) and the teacher's `axum::serve(...)
//! .with_graceful_shutdown(...)` pattern for the dashboard HTTP server.

use std::sync::Arc;
use std::time::Duration;

use glowplug_core::sinks::{MqttSink, Sinks, StoreSink, WebsocketSink};
use glowplug_core::WorkerPool;
use rumqttc::{AsyncClient, MqttOptions};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cli::OpcuaArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::ingress::{self, mqtt_client_id, parse_broker_url};
use crate::opcua::{self, OpcuaConfig};
use crate::{http, STOP_DRAIN};

/// Shared with every HTTP handler: the pool for readiness checks and a
/// websocket sink handle new connections subscribe against.
pub struct AppState {
    pub pool: Arc<WorkerPool>,
    websocket_sink: WebsocketSink,
}

impl AppState {
    pub fn new(pool: Arc<WorkerPool>, websocket_sink: WebsocketSink) -> Self {
        AppState { pool, websocket_sink }
    }

    pub fn websocket_sink(&self) -> &WebsocketSink {
        &self.websocket_sink
    }
}

/// A running bridge: MQTT ingress, the decode/fan-out worker pool, and
/// (when configured) the dashboard HTTP server, all spawned as background
/// tasks cancelled together on `stop()`.
pub struct Service {
    pool: Arc<WorkerPool>,
    cancel: CancellationToken,
}

impl Service {
    pub async fn start(config: Config) -> Result<Self> {
        let cancel = CancellationToken::new();

        let store = match &config.redis_url {
            Some(url) => Some(StoreSink::connect(url).await?),
            None => None,
        };

        let mqtt_sink = match &config.publish_broker_url {
            Some(url) => Some(build_mqtt_sink(url, cancel.clone()).await?),
            None => None,
        };

        let websocket_sink = WebsocketSink::new();
        let sinks = Sinks {
            store,
            mqtt: mqtt_sink,
            websocket: config.http_port.map(|_| websocket_sink.clone()),
        };

        let pool = Arc::new(WorkerPool::new(sinks, cancel.clone()));

        let ingress_pool = pool.clone();
        let ingress_cancel = cancel.clone();
        let broker_url = config.mqtt_broker_url.clone();
        tokio::spawn(async move {
            if let Err(e) = ingress::run(&broker_url, ingress_pool, ingress_cancel).await {
                error!(error = %e, "mqtt ingress exited");
            }
        });

        let run_pool = pool.clone();
        tokio::spawn(async move {
            run_pool.run().await;
        });

        if let Some(port) = config.http_port {
            let state = Arc::new(AppState::new(pool.clone(), websocket_sink));
            let router = http::build_router(state);
            let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
                .await
                .map_err(|e| Error::HttpBind(e.to_string()))?;
            let shutdown_cancel = cancel.clone();
            tokio::spawn(async move {
                let _ = axum::serve(listener, router)
                    .with_graceful_shutdown(async move { shutdown_cancel.cancelled().await })
                    .await;
            });
            info!(port, "dashboard listening");
        }

        Ok(Service { pool, cancel })
    }

    /// Cancels every spawned task and gives the MQTT client a moment to
    /// flush its disconnect before returning.
    pub async fn stop(&self) {
        self.pool.stop();
        self.cancel.cancel();
        tokio::time::sleep(STOP_DRAIN).await;
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }
}

async fn build_mqtt_sink(url: &str, cancel: CancellationToken) -> Result<MqttSink> {
    let (host, port) = parse_broker_url(url)?;
    let mut options = MqttOptions::new(mqtt_client_id(), host, port);
    // rumqttc ties the PINGREQ/PINGRESP timeout to keep_alive; see
    // `ingress::run`'s matching connection for the same note.
    options.set_keep_alive(Duration::from_secs(2));
    let (client, mut eventloop) = AsyncClient::new(options, 100);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = eventloop.poll() => {
                    if let Err(e) = result {
                        warn!(error = %e, "publish mqtt connection error, retrying");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }
    });

    Ok(MqttSink::new(client))
}

/// Runs the OPC UA client until `cancel` fires. A separate entry point from
/// `Service::start` since OPC UA never touches Sparkplug decode or the
/// WebSocket dashboard, matching the source's standalone `opcua` command.
pub async fn run_opcua(args: OpcuaArgs, cancel: CancellationToken) -> Result<()> {
    let store = if args.redis.is_empty() {
        None
    } else {
        Some(Arc::new(StoreSink::connect(&args.redis).await?))
    };

    let mqtt = if args.mqtt.is_empty() {
        None
    } else {
        Some(Arc::new(build_mqtt_sink(&args.mqtt, cancel.clone()).await?))
    };

    let nodes: Vec<String> = if args.nodes.is_empty() {
        Vec::new()
    } else {
        serde_json::from_str(&args.nodes)
            .map_err(|e| Error::Config(format!("invalid --nodes json array: {e}")))?
    };

    let config = OpcuaConfig {
        endpoint: args.endpoint,
        policy: args.policy,
        mode: args.mode,
        cert_file: args.cert,
        key_file: args.key,
        nodes,
        interval: args.interval,
    };

    opcua::run(config, store, mqtt, cancel).await
}
