//! The concrete end-to-end scenarios from the ingestion pipeline's testable
//! properties, exercised at the wire-format layer (topic parse, decode,
//! coerce, key/topic derivation) without the worker pool or sinks.

use sparkplug::coerce::coerce;
use sparkplug::keys::{mqtt_topic, store_key};
use sparkplug::payload::{Metric, Value};
use sparkplug::{Command, Datatype, Topic};

#[test]
fn scenario_1_valid_device_data() {
    let topic =
        Topic::parse("spBv1.0/Plant1:Area3:Line4:Cell2/DDATA/Heater/TempSensor").unwrap();
    assert_eq!(topic.command, Command::DData);

    let metric = Metric {
        name: Some("Current/Celsius".to_string()),
        alias: Some(7),
        timestamp: Some(1_700_000_000_000),
        datatype: Some(Datatype::Float),
        is_historical: false,
        is_transient: false,
        is_null: false,
        metadata: None,
        properties: None,
        value: Some(Value::Float(98.7)),
    };

    let key = store_key(&topic, metric.name.as_deref().unwrap());
    assert_eq!(
        key,
        "glowplug:plant1:area3:line4:cell2:heater:tempsensor:current:celsius"
    );

    let downstream_topic = mqtt_topic(&topic, metric.name.as_deref().unwrap());
    assert_eq!(
        downstream_topic,
        "glowplug/Plant1/Area3/Line4/Cell2/Heater/TempSensor/Current/Celsius"
    );

    let value = coerce(&metric).unwrap();
    assert_eq!(value.display_string(), "98.7");
}

#[test]
fn scenario_2_unsupported_array_type() {
    let metric = Metric {
        name: Some("m".to_string()),
        alias: None,
        timestamp: None,
        datatype: Some(Datatype::FloatArray),
        is_historical: false,
        is_transient: false,
        is_null: false,
        metadata: None,
        properties: None,
        value: Some(Value::Float(1.0)),
    };
    assert!(coerce(&metric).is_err());
}

#[test]
fn scenario_3_malformed_payload() {
    let garbage = [0xFFu8, 0xFF, 0xFF];
    let topic = Topic::parse("spBv1.0/g/DDATA/n/d").unwrap();
    assert!(topic.command.carries_metrics());
    assert!(sparkplug::Payload::decode(&garbage).is_err());
}

#[test]
fn scenario_4_non_metric_command_is_not_decoded() {
    let topic = Topic::parse("spBv1.0/g/NDEATH/n").unwrap();
    assert!(!topic.command.carries_metrics());
}

#[test]
fn scenario_6_state_topic() {
    let topic = Topic::parse("spBv1.0/STATE/Ignition").unwrap();
    assert_eq!(topic.command, Command::State);
    assert_eq!(topic.scada_node_id.as_deref(), Some("Ignition"));
    assert!(!topic.has_device);
    assert!(!topic.command.carries_metrics());
}
