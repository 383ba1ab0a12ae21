//! Datatype coercion: maps a metric's declared datatype and value variant to
//! a canonical JSON scalar, per §4.3's table.

use serde_json::Value as Json;

use crate::datatype::Datatype;
use crate::error::{Error, Result};
use crate::payload::{Metric, Value};

/// The coercion result. Exposes three mutually consistent renderings:
/// `display_string` (human), `bytes` (raw UTF-8 payload, unquoted for raw
/// strings), and `marshal_json` (the properly quoted JSON literal).
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalValue(Json);

impl CanonicalValue {
    pub fn null() -> Self {
        CanonicalValue(Json::Null)
    }

    fn string(s: String) -> Self {
        CanonicalValue(Json::String(s))
    }

    fn boolean(b: bool) -> Self {
        CanonicalValue(Json::Bool(b))
    }

    fn number_i64(n: i64) -> Self {
        CanonicalValue(Json::Number(n.into()))
    }

    fn number_u64(n: u64) -> Self {
        CanonicalValue(Json::Number(n.into()))
    }

    fn number_f64(n: f64) -> Self {
        serde_json::Number::from_f64(n)
            .map(|num| CanonicalValue(Json::Number(num)))
            .unwrap_or_else(CanonicalValue::null)
    }

    /// `f32` values are widened through their own shortest decimal
    /// representation rather than a direct `as f64` cast, so `98.7_f32`
    /// renders as `98.7`, not the f64 bits of the widened float.
    fn number_f32(n: f32) -> Self {
        n.to_string()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(|num| CanonicalValue(Json::Number(num)))
            .unwrap_or_else(CanonicalValue::null)
    }

    /// The underlying JSON value, as consumed by the WebSocket frame and the
    /// store/republish sinks' JSON encoding.
    pub fn as_json(&self) -> &Json {
        &self.0
    }

    /// Human-readable rendering: the bare string for string scalars, the
    /// ordinary JSON text otherwise.
    pub fn display_string(&self) -> String {
        match &self.0 {
            Json::String(s) => s.clone(),
            Json::Null => "null".to_string(),
            other => other.to_string(),
        }
    }

    /// Raw byte form used as the MQTT/store payload: unquoted for strings,
    /// identical to the JSON literal for every other scalar.
    pub fn bytes(&self) -> Vec<u8> {
        match &self.0 {
            Json::String(s) => s.clone().into_bytes(),
            other => serde_json::to_vec(other).unwrap_or_default(),
        }
    }

    /// The properly quoted JSON literal.
    pub fn marshal_json(&self) -> Vec<u8> {
        serde_json::to_vec(&self.0).unwrap_or_default()
    }
}

/// Coerces a metric's value into a `CanonicalValue` per the §4.3 table.
///
/// `DateTime` reads `LongValue`, not `IntValue` — the source's own JSON
/// decode path (`payload_metric.go`) disagrees with its coercion path
/// (`json_type.go`) on this; this implementation follows the
/// Sparkplug-standard 64-bit unsigned millisecond representation.
pub fn coerce(metric: &Metric) -> Result<CanonicalValue> {
    let Some(value) = &metric.value else {
        return Ok(CanonicalValue::null());
    };

    let datatype = metric.datatype.unwrap_or(Datatype::Unknown);

    match datatype {
        Datatype::Int8 | Datatype::Int16 | Datatype::Int32 | Datatype::Int64 => match value {
            Value::Int(v) => Ok(CanonicalValue::number_i64(i64::from(*v as i32))),
            _ => Ok(CanonicalValue::null()),
        },
        Datatype::DateTime => match value {
            Value::Long(v) => Ok(CanonicalValue::number_u64(*v)),
            _ => Ok(CanonicalValue::null()),
        },
        Datatype::UInt8 | Datatype::UInt16 | Datatype::UInt32 | Datatype::UInt64 => match value {
            Value::Long(v) => Ok(CanonicalValue::number_u64(*v)),
            _ => Ok(CanonicalValue::null()),
        },
        Datatype::Float => match value {
            Value::Float(v) => Ok(CanonicalValue::number_f32(*v)),
            _ => Ok(CanonicalValue::null()),
        },
        Datatype::Double => match value {
            Value::Double(v) => Ok(CanonicalValue::number_f64(*v)),
            _ => Ok(CanonicalValue::null()),
        },
        Datatype::Boolean => match value {
            Value::Boolean(v) => Ok(CanonicalValue::boolean(*v)),
            _ => Ok(CanonicalValue::null()),
        },
        Datatype::String | Datatype::Text | Datatype::Uuid | Datatype::DataSet => match value {
            Value::String(v) => Ok(CanonicalValue::string(v.clone())),
            _ => Ok(CanonicalValue::null()),
        },
        Datatype::Bytes | Datatype::File => match value {
            Value::Bytes(v) => Ok(CanonicalValue::string(String::from_utf8_lossy(v).into_owned())),
            _ => Ok(CanonicalValue::null()),
        },
        _ => Err(Error::UnsupportedDatatype(datatype)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Metric;

    fn metric(datatype: Datatype, value: Option<Value>) -> Metric {
        Metric {
            name: Some("m".to_string()),
            alias: Some(1),
            timestamp: Some(1),
            datatype: Some(datatype),
            is_historical: false,
            is_transient: false,
            is_null: value.is_none(),
            metadata: None,
            properties: None,
            value,
        }
    }

    #[test]
    fn coerces_every_scalar_kind_in_the_table() {
        assert_eq!(
            coerce(&metric(Datatype::Int32, Some(Value::Int(42)))).unwrap().as_json(),
            &Json::from(42)
        );
        assert_eq!(
            coerce(&metric(Datatype::UInt64, Some(Value::Long(18_000_000_000))))
                .unwrap()
                .as_json(),
            &Json::from(18_000_000_000u64)
        );
        assert_eq!(
            coerce(&metric(Datatype::Float, Some(Value::Float(98.7))))
                .unwrap()
                .as_json(),
            &Json::from(98.7_f64)
        );
        assert_eq!(
            coerce(&metric(Datatype::Boolean, Some(Value::Boolean(true))))
                .unwrap()
                .as_json(),
            &Json::Bool(true)
        );
        assert_eq!(
            coerce(&metric(Datatype::String, Some(Value::String("x".into()))))
                .unwrap()
                .as_json(),
            &Json::from("x")
        );
    }

    #[test]
    fn datetime_reads_long_value_not_int_value() {
        let m = metric(Datatype::DateTime, Some(Value::Long(1_700_000_000_000)));
        let v = coerce(&m).unwrap();
        assert_eq!(v.as_json(), &Json::from(1_700_000_000_000u64));
    }

    #[test]
    fn missing_value_yields_null_without_failing() {
        let m = metric(Datatype::Int32, None);
        let v = coerce(&m).unwrap();
        assert_eq!(v.as_json(), &Json::Null);
    }

    #[test]
    fn unsupported_array_datatype_fails() {
        let m = metric(Datatype::FloatArray, Some(Value::Float(1.0)));
        let err = coerce(&m).unwrap_err();
        assert!(matches!(err, Error::UnsupportedDatatype(Datatype::FloatArray)));
    }

    #[test]
    fn display_bytes_and_json_agree_on_content() {
        let m = metric(Datatype::String, Some(Value::String("hello".into())));
        let v = coerce(&m).unwrap();
        assert_eq!(v.display_string(), "hello");
        assert_eq!(v.bytes(), b"hello");
        assert_eq!(v.marshal_json(), b"\"hello\"");
    }

    #[test]
    fn float_round_trips_through_json_without_precision_loss() {
        let m = metric(Datatype::Double, Some(Value::Double(98.76543210123)));
        let v = coerce(&m).unwrap();
        let reparsed: f64 = serde_json::from_slice(&v.marshal_json()).unwrap();
        assert_eq!(reparsed, 98.76543210123);
    }
}
