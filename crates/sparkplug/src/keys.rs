//! Deterministic derivation of downstream sink identifiers from
//! `(Topic, metric name)` — store keys and MQTT topics.
//!
//! Both derivations are pure functions: identical input always yields the
//! identical output, and no collision detection is attempted.

use crate::topic::Topic;

const STORE_PREFIX: &str = "glowplug";
const MQTT_PREFIX: &str = "glowplug";

/// Lowercases, maps spaces to `_`, and maps `/` to `:`.
pub fn normalize_key(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            ' ' => '_',
            '/' => ':',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
}

/// Maps `:` to `/`, preserving Sparkplug-style colon-grouped names as MQTT
/// topic hierarchy.
pub fn normalize_topic(s: &str) -> String {
    s.chars()
        .map(|c| if c == ':' { '/' } else { c })
        .collect()
}

/// Builds the Redis-style store key for a metric on a Sparkplug topic:
/// `glowplug:<group>:<node>[:<device>]:<metric>`, fully normalized.
pub fn store_key(topic: &Topic, metric_name: &str) -> String {
    let mut raw = format!("{STORE_PREFIX}:{}:{}", topic.group_id, topic.edge_node_id);
    if let Some(device) = &topic.device_id {
        raw.push(':');
        raw.push_str(device);
    }
    raw.push(':');
    raw.push_str(metric_name);
    normalize_key(&raw)
}

/// Builds the downstream republish MQTT topic for a metric:
/// `glowplug/<group>/<node>[/<device>]/<metric>`, with `:` rewritten to `/`.
pub fn mqtt_topic(topic: &Topic, metric_name: &str) -> String {
    let mut raw = format!("{MQTT_PREFIX}/{}/{}", topic.group_id, topic.edge_node_id);
    if let Some(device) = &topic.device_id {
        raw.push('/');
        raw.push_str(device);
    }
    raw.push('/');
    raw.push_str(metric_name);
    normalize_topic(&raw)
}

/// An OPC UA node identifier, numeric or string-form.
pub enum OpcuaNodeId<'a> {
    Numeric(u32),
    StringLike(&'a str),
}

/// Builds the store key for an OPC UA node:
/// `glowplug:opcua:<ProductURI>:<Namespace>:i:<IntID>` or `:s:<StringID>`.
pub fn opcua_store_key(product_uri: &str, namespace: u16, id: &OpcuaNodeId<'_>) -> String {
    let raw = match id {
        OpcuaNodeId::Numeric(n) => {
            format!("glowplug:opcua:{product_uri}:{namespace}:i:{n}")
        }
        OpcuaNodeId::StringLike(s) => {
            format!("glowplug:opcua:{product_uri}:{namespace}:s:{s}")
        }
    };
    normalize_key(&raw)
}

/// Builds the downstream MQTT topic for an OPC UA node, `/`-delimited.
pub fn opcua_mqtt_topic(product_uri: &str, namespace: u16, id: &OpcuaNodeId<'_>) -> String {
    normalize_topic(&opcua_store_key(product_uri, namespace, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topic::Topic;

    fn topic(group: &str, node: &str, device: Option<&str>) -> Topic {
        let raw = match device {
            Some(d) => format!("spBv1.0/{group}/DDATA/{node}/{d}"),
            None => format!("spBv1.0/{group}/NDATA/{node}"),
        };
        Topic::parse(&raw).unwrap()
    }

    #[test]
    fn store_key_matches_worked_example() {
        let t = topic("Plant1:Area3:Line4:Cell2", "Heater", Some("TempSensor"));
        assert_eq!(
            store_key(&t, "Current/Celsius"),
            "glowplug:plant1:area3:line4:cell2:heater:tempsensor:current:celsius"
        );
    }

    #[test]
    fn mqtt_topic_matches_worked_example() {
        let t = topic("Plant1:Area3:Line4:Cell2", "Heater", Some("TempSensor"));
        assert_eq!(
            mqtt_topic(&t, "Current/Celsius"),
            "glowplug/Plant1/Area3/Line4/Cell2/Heater/TempSensor/Current/Celsius"
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let s = "glowplug:plant1 area3:line4/cell2";
        let once = normalize_key(s);
        let twice = normalize_key(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn key_derivation_is_deterministic() {
        let t = topic("g", "n", None);
        assert_eq!(store_key(&t, "m"), store_key(&t, "m"));
    }

    #[test]
    fn opcua_key_numeric_vs_string() {
        let k1 = opcua_store_key("urn:product", 2, &OpcuaNodeId::Numeric(42));
        let k2 = opcua_store_key("urn:product", 2, &OpcuaNodeId::StringLike("Tag1"));
        assert!(k1.contains(":i:42"));
        assert!(k2.contains(":s:tag1"));
    }
}
