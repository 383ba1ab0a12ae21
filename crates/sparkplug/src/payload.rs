//! The Sparkplug B payload: binary protobuf decode/encode, and a JSON
//! encoding that renders each metric's numeric `Datatype` as its name.
//!
//! The wire shape is defined in `proto/sparkplug_b.proto`. This module
//! converts between the generated prost types (`wire::Payload` etc, a
//! direct mirror of the wire format) and the domain types below, which are
//! what the rest of the crate and its callers work with.

use prost::Message as _;
use serde::{Deserialize, Serialize};

use crate::datatype::Datatype;
use crate::error::{Error, Result};

mod wire {
    include!(concat!(env!("OUT_DIR"), "/org.eclipse.tahu.protobuf.rs"));
}

/// The tagged-union metric value. Exactly one variant is populated for a
/// non-null metric; `IsNull` metrics carry no value at all.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(u32),
    Long(u64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
    Bytes(Vec<u8>),
    DataSet(DataSet),
    Template(Template),
    Extension(u64),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSetValue {
    pub value: Option<DataSetScalar>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataSetScalar {
    Int(u32),
    Long(u64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
    Extension(u64),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSet {
    pub num_of_columns: u64,
    pub columns: Vec<String>,
    pub types: Vec<u32>,
    pub rows: Vec<Vec<DataSetValue>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub version: Option<String>,
    pub metrics: Vec<Metric>,
    pub template_ref: Option<String>,
    pub is_definition: Option<bool>,
}

/// A property value: the same kind of tagged union as `Value`, minus the
/// dataset/template/bytes variants, plus nested property sets.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Int(u32),
    Long(u64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
    PropertySet(PropertySet),
    PropertySetList(Vec<PropertySet>),
    Null,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertySet {
    pub keys: Vec<String>,
    pub values: Vec<PropertyValue>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetaData {
    pub is_multi_part: Option<bool>,
    pub content_type: Option<String>,
    pub size: Option<u64>,
    pub seq: Option<u64>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub md5: Option<String>,
    pub description: Option<String>,
}

/// A single metric, as carried inside a `Payload`.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: Option<String>,
    pub alias: Option<u64>,
    pub timestamp: Option<u64>,
    pub datatype: Option<Datatype>,
    pub is_historical: bool,
    pub is_transient: bool,
    pub is_null: bool,
    pub metadata: Option<MetaData>,
    pub properties: Option<PropertySet>,
    pub value: Option<Value>,
}

/// The top-level Sparkplug payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Payload {
    pub timestamp: Option<u64>,
    pub metrics: Vec<Metric>,
    pub seq: Option<u64>,
    pub uuid: Option<String>,
    pub body: Option<Vec<u8>>,
}

impl Payload {
    /// Decodes a length-delimited binary Sparkplug payload.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let wire = wire::Payload::decode(bytes)?;
        Ok(Payload::from_wire(wire))
    }

    /// Encodes to the binary wire format.
    pub fn encode(&self) -> Vec<u8> {
        self.to_wire().encode_to_vec()
    }

    fn from_wire(w: wire::Payload) -> Self {
        Payload {
            timestamp: w.timestamp,
            metrics: w.metrics.into_iter().map(Metric::from_wire).collect(),
            seq: w.seq,
            uuid: w.uuid,
            body: w.body,
        }
    }

    fn to_wire(&self) -> wire::Payload {
        wire::Payload {
            timestamp: self.timestamp,
            metrics: self.metrics.iter().map(Metric::to_wire).collect(),
            seq: self.seq,
            uuid: self.uuid.clone(),
            body: self.body.clone(),
        }
    }
}

impl Metric {
    /// Fails with `NilMetric`/`EmptyMetricName` for structurally invalid
    /// metrics, used by the fan-out stage before coercion.
    pub fn validate(&self) -> Result<()> {
        if self.name.as_deref().is_some_and(str::is_empty) {
            return Err(Error::EmptyMetricName);
        }
        Ok(())
    }

    fn from_wire(w: wire::payload::Metric) -> Self {
        let datatype = w.datatype.and_then(|d| Datatype::from_u32(d).ok());
        Metric {
            name: w.name,
            alias: w.alias,
            timestamp: w.timestamp,
            datatype,
            is_historical: w.is_historical.unwrap_or(false),
            is_transient: w.is_transient.unwrap_or(false),
            is_null: w.is_null.unwrap_or(false),
            metadata: w.metadata.map(MetaData::from_wire),
            properties: w.properties.map(PropertySet::from_wire),
            value: w.value.map(Value::from_wire),
        }
    }

    fn to_wire(&self) -> wire::payload::Metric {
        wire::payload::Metric {
            name: self.name.clone(),
            alias: self.alias,
            timestamp: self.timestamp,
            datatype: self.datatype.map(Datatype::as_u32),
            is_historical: Some(self.is_historical),
            is_transient: Some(self.is_transient),
            is_null: Some(self.is_null),
            metadata: self.metadata.as_ref().map(MetaData::to_wire),
            properties: self.properties.as_ref().map(PropertySet::to_wire),
            value: self.value.as_ref().map(Value::to_wire),
        }
    }
}

impl MetaData {
    fn from_wire(w: wire::payload::MetaData) -> Self {
        MetaData {
            is_multi_part: w.is_multi_part,
            content_type: w.content_type,
            size: w.size,
            seq: w.seq,
            file_name: w.file_name,
            file_type: w.file_type,
            md5: w.md5,
            description: w.description,
        }
    }

    fn to_wire(&self) -> wire::payload::MetaData {
        wire::payload::MetaData {
            is_multi_part: self.is_multi_part,
            content_type: self.content_type.clone(),
            size: self.size,
            seq: self.seq,
            file_name: self.file_name.clone(),
            file_type: self.file_type.clone(),
            md5: self.md5.clone(),
            description: self.description.clone(),
        }
    }
}

impl Value {
    fn from_wire(w: wire::payload::metric::Value) -> Self {
        use wire::payload::metric::Value as W;
        match w {
            W::IntValue(v) => Value::Int(v),
            W::LongValue(v) => Value::Long(v),
            W::FloatValue(v) => Value::Float(v),
            W::DoubleValue(v) => Value::Double(v),
            W::BooleanValue(v) => Value::Boolean(v),
            W::StringValue(v) => Value::String(v),
            W::BytesValue(v) => Value::Bytes(v),
            W::DatasetValue(v) => Value::DataSet(DataSet::from_wire(v)),
            W::TemplateValue(v) => Value::Template(Template::from_wire(v)),
            W::ExtensionValue(v) => Value::Extension(v),
        }
    }

    fn to_wire(&self) -> wire::payload::metric::Value {
        use wire::payload::metric::Value as W;
        match self {
            Value::Int(v) => W::IntValue(*v),
            Value::Long(v) => W::LongValue(*v),
            Value::Float(v) => W::FloatValue(*v),
            Value::Double(v) => W::DoubleValue(*v),
            Value::Boolean(v) => W::BooleanValue(*v),
            Value::String(v) => W::StringValue(v.clone()),
            Value::Bytes(v) => W::BytesValue(v.clone()),
            Value::DataSet(v) => W::DatasetValue(v.to_wire()),
            Value::Template(v) => W::TemplateValue(v.to_wire()),
            Value::Extension(v) => W::ExtensionValue(*v),
        }
    }
}

impl DataSet {
    fn from_wire(w: wire::payload::DataSet) -> Self {
        DataSet {
            num_of_columns: w.num_of_columns,
            columns: w.columns,
            types: w.types,
            rows: w
                .rows
                .into_iter()
                .map(|row| row.elements.into_iter().map(DataSetValue::from_wire).collect())
                .collect(),
        }
    }

    fn to_wire(&self) -> wire::payload::DataSet {
        wire::payload::DataSet {
            num_of_columns: self.num_of_columns,
            columns: self.columns.clone(),
            types: self.types.clone(),
            rows: self
                .rows
                .iter()
                .map(|row| wire::payload::data_set::Row {
                    elements: row.iter().map(DataSetValue::to_wire).collect(),
                })
                .collect(),
        }
    }
}

impl DataSetValue {
    fn from_wire(w: wire::payload::data_set::DataSetValue) -> Self {
        use wire::payload::data_set::data_set_value::Value as W;
        DataSetValue {
            value: w.value.map(|v| match v {
                W::IntValue(v) => DataSetScalar::Int(v),
                W::LongValue(v) => DataSetScalar::Long(v),
                W::FloatValue(v) => DataSetScalar::Float(v),
                W::DoubleValue(v) => DataSetScalar::Double(v),
                W::BooleanValue(v) => DataSetScalar::Boolean(v),
                W::StringValue(v) => DataSetScalar::String(v),
                W::ExtensionValue(v) => DataSetScalar::Extension(v),
            }),
        }
    }

    fn to_wire(&self) -> wire::payload::data_set::DataSetValue {
        use wire::payload::data_set::data_set_value::Value as W;
        wire::payload::data_set::DataSetValue {
            value: self.value.as_ref().map(|v| match v {
                DataSetScalar::Int(v) => W::IntValue(*v),
                DataSetScalar::Long(v) => W::LongValue(*v),
                DataSetScalar::Float(v) => W::FloatValue(*v),
                DataSetScalar::Double(v) => W::DoubleValue(*v),
                DataSetScalar::Boolean(v) => W::BooleanValue(*v),
                DataSetScalar::String(v) => W::StringValue(v.clone()),
                DataSetScalar::Extension(v) => W::ExtensionValue(*v),
            }),
        }
    }
}

impl Template {
    fn from_wire(w: wire::payload::Template) -> Self {
        Template {
            version: w.version,
            metrics: w.metrics.into_iter().map(Metric::from_wire).collect(),
            template_ref: w.template_ref,
            is_definition: w.is_definition,
        }
    }

    fn to_wire(&self) -> wire::payload::Template {
        wire::payload::Template {
            version: self.version.clone(),
            metrics: self.metrics.iter().map(Metric::to_wire).collect(),
            parameters: Vec::new(),
            template_ref: self.template_ref.clone(),
            is_definition: self.is_definition,
        }
    }
}

impl PropertySet {
    fn from_wire(w: wire::payload::PropertySet) -> Self {
        // The source pre-sizes its output slice to the input length and then
        // `append`s into it, doubling the result. This overwrites by index
        // instead, so the output has exactly as many entries as the input.
        let values = w
            .values
            .into_iter()
            .map(PropertyValue::from_wire)
            .collect();
        PropertySet {
            keys: w.keys,
            values,
        }
    }

    fn to_wire(&self) -> wire::payload::PropertySet {
        wire::payload::PropertySet {
            keys: self.keys.clone(),
            values: self.values.iter().map(PropertyValue::to_wire).collect(),
        }
    }
}

impl PropertyValue {
    fn from_wire(w: wire::payload::PropertyValue) -> Self {
        use wire::payload::property_value::Value as W;
        if w.is_null.unwrap_or(false) {
            return PropertyValue::Null;
        }
        match w.value {
            Some(W::IntValue(v)) => PropertyValue::Int(v),
            Some(W::LongValue(v)) => PropertyValue::Long(v),
            Some(W::FloatValue(v)) => PropertyValue::Float(v),
            Some(W::DoubleValue(v)) => PropertyValue::Double(v),
            Some(W::BooleanValue(v)) => PropertyValue::Boolean(v),
            Some(W::StringValue(v)) => PropertyValue::String(v),
            Some(W::PropertysetValue(v)) => PropertyValue::PropertySet(PropertySet::from_wire(v)),
            Some(W::PropertysetsValue(v)) => PropertyValue::PropertySetList(
                v.propertyset.into_iter().map(PropertySet::from_wire).collect(),
            ),
            None => PropertyValue::Null,
        }
    }

    fn to_wire(&self) -> wire::payload::PropertyValue {
        use wire::payload::property_value::Value as W;
        let (is_null, value) = match self {
            PropertyValue::Int(v) => (false, Some(W::IntValue(*v))),
            PropertyValue::Long(v) => (false, Some(W::LongValue(*v))),
            PropertyValue::Float(v) => (false, Some(W::FloatValue(*v))),
            PropertyValue::Double(v) => (false, Some(W::DoubleValue(*v))),
            PropertyValue::Boolean(v) => (false, Some(W::BooleanValue(*v))),
            PropertyValue::String(v) => (false, Some(W::StringValue(v.clone()))),
            PropertyValue::PropertySet(v) => (false, Some(W::PropertysetValue(v.to_wire()))),
            PropertyValue::PropertySetList(v) => (
                false,
                Some(W::PropertysetsValue(wire::payload::PropertySetList {
                    propertyset: v.iter().map(PropertySet::to_wire).collect(),
                })),
            ),
            PropertyValue::Null => (true, None),
        };
        wire::payload::PropertyValue {
            r#type: None,
            is_null: Some(is_null),
            value,
        }
    }
}

/// JSON rendering of a metric: identical to the binary schema's fields,
/// except `Datatype` is the canonical name, not the wire number. Mirrors
/// `payload_metric.go`'s unexported `payloadMetric` struct.
#[derive(Debug, Serialize, Deserialize)]
struct MetricJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    datatype: Option<String>,
    #[serde(default)]
    is_historical: bool,
    #[serde(default)]
    is_transient: bool,
    #[serde(default)]
    is_null: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<MetaDataJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    properties: Option<PropertySetJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct MetaDataJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    is_multi_part: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seq: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    md5: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

/// A `Properties.Values` entry, keyed by the numeric wire `Type` (1=Int,
/// 2=Long, 3=Float, 4=Double, 5=Boolean, 6=String, 7=PropertySet,
/// 8=PropertySetList, 9=Extension), not the `Datatype` enum.
#[derive(Debug, Serialize, Deserialize)]
struct PropertyValueJson {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    r#type: Option<u32>,
    #[serde(default)]
    is_null: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct PropertySetJson {
    #[serde(default)]
    keys: Vec<String>,
    #[serde(default)]
    values: Vec<PropertyValueJson>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct DataSetValueJson {
    #[serde(rename = "IntValue", skip_serializing_if = "Option::is_none")]
    int_value: Option<u32>,
    #[serde(rename = "LongValue", skip_serializing_if = "Option::is_none")]
    long_value: Option<u64>,
    #[serde(rename = "FloatValue", skip_serializing_if = "Option::is_none")]
    float_value: Option<f32>,
    #[serde(rename = "DoubleValue", skip_serializing_if = "Option::is_none")]
    double_value: Option<f64>,
    #[serde(rename = "BooleanValue", skip_serializing_if = "Option::is_none")]
    boolean_value: Option<bool>,
    #[serde(rename = "StringValue", skip_serializing_if = "Option::is_none")]
    string_value: Option<String>,
    #[serde(rename = "ExtensionValue", skip_serializing_if = "Option::is_none")]
    extension_value: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct DataSetJson {
    #[serde(rename = "NumOfColumns", default)]
    num_of_columns: u64,
    #[serde(rename = "Columns", default)]
    columns: Vec<String>,
    #[serde(rename = "Types", default)]
    types: Vec<u32>,
    #[serde(rename = "Rows", default)]
    rows: Vec<Vec<DataSetValueJson>>,
}

fn json_u64(value: &serde_json::Value) -> Result<u64> {
    value
        .as_u64()
        .ok_or_else(|| Error::InvalidWireFormat("expected an integer value".to_string()))
}

fn json_f64(value: &serde_json::Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| Error::InvalidWireFormat("expected a numeric value".to_string()))
}

impl MetaData {
    fn to_json_struct(&self) -> MetaDataJson {
        MetaDataJson {
            is_multi_part: self.is_multi_part,
            content_type: self.content_type.clone(),
            size: self.size,
            seq: self.seq,
            file_name: self.file_name.clone(),
            file_type: self.file_type.clone(),
            md5: self.md5.clone(),
            description: self.description.clone(),
        }
    }

    fn from_json_struct(j: MetaDataJson) -> Self {
        MetaData {
            is_multi_part: j.is_multi_part,
            content_type: j.content_type,
            size: j.size,
            seq: j.seq,
            file_name: j.file_name,
            file_type: j.file_type,
            md5: j.md5,
            description: j.description,
        }
    }
}

impl DataSetValue {
    fn to_json_struct(&self) -> DataSetValueJson {
        let mut j = DataSetValueJson::default();
        match &self.value {
            Some(DataSetScalar::Int(v)) => j.int_value = Some(*v),
            Some(DataSetScalar::Long(v)) => j.long_value = Some(*v),
            Some(DataSetScalar::Float(v)) => j.float_value = Some(*v),
            Some(DataSetScalar::Double(v)) => j.double_value = Some(*v),
            Some(DataSetScalar::Boolean(v)) => j.boolean_value = Some(*v),
            Some(DataSetScalar::String(v)) => j.string_value = Some(v.clone()),
            Some(DataSetScalar::Extension(_)) | None => {}
        }
        j
    }

    /// Dispatches on which field is present in the raw object, per §4.2's
    /// `DataSetValue` supplement. Extension values are unsupported.
    fn from_json_struct(j: &DataSetValueJson) -> Result<Self> {
        let value = if let Some(v) = j.int_value {
            Some(DataSetScalar::Int(v))
        } else if let Some(v) = j.long_value {
            Some(DataSetScalar::Long(v))
        } else if let Some(v) = j.float_value {
            Some(DataSetScalar::Float(v))
        } else if let Some(v) = j.double_value {
            Some(DataSetScalar::Double(v))
        } else if let Some(v) = j.boolean_value {
            Some(DataSetScalar::Boolean(v))
        } else if let Some(v) = &j.string_value {
            Some(DataSetScalar::String(v.clone()))
        } else if j.extension_value.is_some() {
            return Err(Error::UnsupportedDatatype(Datatype::Unknown));
        } else {
            None
        };
        Ok(DataSetValue { value })
    }
}

impl DataSet {
    fn to_json_struct(&self) -> DataSetJson {
        DataSetJson {
            num_of_columns: self.num_of_columns,
            columns: self.columns.clone(),
            types: self.types.clone(),
            rows: self
                .rows
                .iter()
                .map(|row| row.iter().map(DataSetValue::to_json_struct).collect())
                .collect(),
        }
    }

    fn from_json_struct(j: DataSetJson) -> Result<Self> {
        let rows = j
            .rows
            .iter()
            .map(|row| row.iter().map(DataSetValue::from_json_struct).collect::<Result<Vec<_>>>())
            .collect::<Result<Vec<_>>>()?;
        Ok(DataSet {
            num_of_columns: j.num_of_columns,
            columns: j.columns,
            types: j.types,
            rows,
        })
    }
}

impl PropertyValue {
    fn to_json_struct(&self) -> PropertyValueJson {
        let (wire_type, value) = match self {
            PropertyValue::Int(v) => (1, Some(serde_json::json!(v))),
            PropertyValue::Long(v) => (2, Some(serde_json::json!(v))),
            PropertyValue::Float(v) => (3, Some(serde_json::json!(v))),
            PropertyValue::Double(v) => (4, Some(serde_json::json!(v))),
            PropertyValue::Boolean(v) => (5, Some(serde_json::json!(v))),
            PropertyValue::String(v) => (6, Some(serde_json::json!(v))),
            PropertyValue::PropertySet(v) => (
                7,
                Some(serde_json::to_value(v.to_json_struct()).unwrap_or(serde_json::Value::Null)),
            ),
            PropertyValue::PropertySetList(v) => (
                8,
                Some(serde_json::Value::Array(
                    v.iter()
                        .map(|p| serde_json::to_value(p.to_json_struct()).unwrap_or(serde_json::Value::Null))
                        .collect(),
                )),
            ),
            PropertyValue::Null => (0, None),
        };
        PropertyValueJson {
            r#type: Some(wire_type),
            is_null: matches!(self, PropertyValue::Null),
            value,
        }
    }

    /// Decodes a `Properties.Values` entry from its numeric wire `Type`
    /// field, per `payload_metric.go`'s `UnmarshalJSON` switch.
    fn from_json_struct(j: &PropertyValueJson) -> Result<Self> {
        if j.is_null {
            return Ok(PropertyValue::Null);
        }
        let value = j
            .value
            .as_ref()
            .ok_or_else(|| Error::InvalidWireFormat("property value missing \"value\"".to_string()))?;
        match j.r#type.unwrap_or_default() {
            1 => Ok(PropertyValue::Int(json_u64(value)? as u32)),
            2 => Ok(PropertyValue::Long(json_u64(value)?)),
            3 => Ok(PropertyValue::Float(json_f64(value)? as f32)),
            4 => Ok(PropertyValue::Double(json_f64(value)?)),
            5 => Ok(PropertyValue::Boolean(
                value
                    .as_bool()
                    .ok_or_else(|| Error::InvalidWireFormat("expected a boolean value".to_string()))?,
            )),
            6 => Ok(PropertyValue::String(
                value
                    .as_str()
                    .ok_or_else(|| Error::InvalidWireFormat("expected a string value".to_string()))?
                    .to_string(),
            )),
            7 => Ok(PropertyValue::PropertySet(PropertySet::from_json_value(value)?)),
            8 => {
                let entries = value
                    .as_array()
                    .ok_or_else(|| Error::InvalidWireFormat("expected an array of property sets".to_string()))?;
                let sets = entries
                    .iter()
                    .map(PropertySet::from_json_value)
                    .collect::<Result<Vec<_>>>()?;
                Ok(PropertyValue::PropertySetList(sets))
            }
            9 => Err(Error::InvalidWireFormat("extension property values are not supported".to_string())),
            other => Err(Error::UnknownDatatype(other.to_string())),
        }
    }
}

impl PropertySet {
    fn to_json_struct(&self) -> PropertySetJson {
        PropertySetJson {
            keys: self.keys.clone(),
            values: self.values.iter().map(PropertyValue::to_json_struct).collect(),
        }
    }

    fn from_json_value(value: &serde_json::Value) -> Result<Self> {
        let raw: PropertySetJson =
            serde_json::from_value(value.clone()).map_err(|e| Error::InvalidWireFormat(e.to_string()))?;
        let values = raw
            .values
            .iter()
            .map(PropertyValue::from_json_struct)
            .collect::<Result<Vec<_>>>()?;
        Ok(PropertySet { keys: raw.keys, values })
    }
}

impl Value {
    /// Renders the populated variant as JSON. The declared `Datatype` only
    /// matters on decode, where the wire oneof doesn't exist yet.
    fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Int(v) => serde_json::json!(v),
            Value::Long(v) => serde_json::json!(v),
            Value::Float(v) => serde_json::json!(v),
            Value::Double(v) => serde_json::json!(v),
            Value::Boolean(v) => serde_json::json!(v),
            Value::String(v) => serde_json::json!(v),
            Value::Bytes(v) => serde_json::json!(v),
            Value::DataSet(v) => serde_json::to_value(v.to_json_struct()).unwrap_or(serde_json::Value::Null),
            Value::Template(_) | Value::Extension(_) => serde_json::Value::Null,
        }
    }
}

impl Metric {
    /// Renders the datatype-as-name JSON projection described in §4.2.
    /// Value-variant JSON rendering for sinks is handled by `crate::coerce`.
    pub fn datatype_json(&self) -> serde_json::Value {
        let base = MetricJson {
            name: self.name.clone(),
            alias: self.alias,
            timestamp: self.timestamp,
            datatype: self.datatype.map(Datatype::name).map(str::to_string),
            is_historical: self.is_historical,
            is_transient: self.is_transient,
            is_null: self.is_null,
            metadata: None,
            properties: None,
            value: None,
        };
        serde_json::to_value(base).unwrap_or(serde_json::Value::Null)
    }

    /// Parses a `Datatype` name back to its enum value for JSON decode,
    /// failing with `UnknownDatatype` per §4.2.
    pub fn datatype_from_json_name(name: &str) -> Result<Datatype> {
        Datatype::from_name(name)
    }

    /// Full JSON encoding: name/alias/timestamp/flags, the datatype name,
    /// metadata, properties, and the value oneof rendered as its JSON
    /// scalar/object. Mirrors `payload_metric.go`'s `MarshalJSON`.
    pub fn to_json(&self) -> serde_json::Value {
        let base = MetricJson {
            name: self.name.clone(),
            alias: self.alias,
            timestamp: self.timestamp,
            datatype: self.datatype.map(Datatype::name).map(str::to_string),
            is_historical: self.is_historical,
            is_transient: self.is_transient,
            is_null: self.is_null,
            metadata: self.metadata.as_ref().map(MetaData::to_json_struct),
            properties: self.properties.as_ref().map(PropertySet::to_json_struct),
            value: self.value.as_ref().map(Value::to_json),
        };
        serde_json::to_value(base).unwrap_or(serde_json::Value::Null)
    }

    /// Full JSON decode, the inverse of `to_json`. The `value` field is
    /// dispatched against the stated `datatype` name, and `properties`
    /// entries are dispatched against their numeric wire `Type`, mirroring
    /// `payload_metric.go`'s `UnmarshalJSON`.
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let raw: MetricJson = serde_json::from_value(json.clone()).map_err(|e| Error::InvalidWireFormat(e.to_string()))?;
        let datatype = raw.datatype.as_deref().map(Datatype::from_name).transpose()?;

        let value = match (&raw.value, datatype) {
            (None, _) => None,
            (Some(v), Some(dt)) => Some(Self::value_from_json(dt, v)?),
            (Some(_), None) => return Err(Error::UnknownDatatype(String::new())),
        };

        Ok(Metric {
            name: raw.name,
            alias: raw.alias,
            timestamp: raw.timestamp,
            datatype,
            is_historical: raw.is_historical,
            is_transient: raw.is_transient,
            is_null: raw.is_null,
            metadata: raw.metadata.map(MetaData::from_json_struct),
            properties: raw.properties.map(|p| {
                let values = p
                    .values
                    .iter()
                    .map(PropertyValue::from_json_struct)
                    .collect::<Result<Vec<_>>>();
                values.map(|values| PropertySet { keys: p.keys, values })
            }).transpose()?,
            value,
        })
    }

    /// Decodes the `value` field against the metric's stated `Datatype`
    /// name, per §4.2 and `payload_metric.go`'s `UnmarshalJSON` switch.
    /// Types outside the table fail with `UnsupportedDatatype`, the same
    /// way `coerce::coerce` rejects them on the encode side.
    fn value_from_json(datatype: Datatype, value: &serde_json::Value) -> Result<Value> {
        match datatype {
            Datatype::Boolean => Ok(Value::Boolean(
                value
                    .as_bool()
                    .ok_or_else(|| Error::InvalidWireFormat("expected a boolean value".to_string()))?,
            )),
            Datatype::Int8 | Datatype::Int16 | Datatype::Int32 | Datatype::UInt8 | Datatype::UInt16 | Datatype::UInt32 => {
                Ok(Value::Int(json_u64(value)? as u32))
            }
            Datatype::Int64 | Datatype::UInt64 | Datatype::DateTime => Ok(Value::Long(json_u64(value)?)),
            Datatype::Float => Ok(Value::Float(json_f64(value)? as f32)),
            Datatype::Double => Ok(Value::Double(json_f64(value)?)),
            Datatype::String | Datatype::Text | Datatype::Uuid => Ok(Value::String(
                value
                    .as_str()
                    .ok_or_else(|| Error::InvalidWireFormat("expected a string value".to_string()))?
                    .to_string(),
            )),
            Datatype::DataSet => {
                let raw: DataSetJson =
                    serde_json::from_value(value.clone()).map_err(|e| Error::InvalidWireFormat(e.to_string()))?;
                Ok(Value::DataSet(DataSet::from_json_struct(raw)?))
            }
            other => Err(Error::UnsupportedDatatype(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(datatype: Datatype, value: Value) -> Metric {
        Metric {
            name: Some("m".to_string()),
            alias: Some(1),
            timestamp: Some(1000),
            datatype: Some(datatype),
            is_historical: false,
            is_transient: false,
            is_null: false,
            metadata: None,
            properties: None,
            value: Some(value),
        }
    }

    #[test]
    fn round_trips_scalar_metrics_through_binary_wire() {
        let cases = vec![
            metric(Datatype::Int32, Value::Int(42)),
            metric(Datatype::Int64, Value::Long(9_000_000_000)),
            metric(Datatype::UInt64, Value::Long(18_000_000_000_000_000_000)),
            metric(Datatype::Float, Value::Float(1.5)),
            metric(Datatype::Double, Value::Double(2.5)),
            metric(Datatype::Boolean, Value::Boolean(true)),
            metric(Datatype::String, Value::String("hi".to_string())),
            metric(Datatype::DateTime, Value::Long(1_700_000_000_000)),
            metric(Datatype::Uuid, Value::String("abc-123".to_string())),
        ];
        for m in cases {
            let payload = Payload {
                timestamp: Some(1),
                metrics: vec![m.clone()],
                seq: Some(3),
                uuid: None,
                body: None,
            };
            let bytes = payload.encode();
            let decoded = Payload::decode(&bytes).unwrap();
            assert_eq!(decoded.metrics[0], m);
        }
    }

    #[test]
    fn malformed_bytes_fail_with_invalid_wire_format() {
        let garbage = [0xFFu8, 0xFF, 0xFF];
        let err = Payload::decode(&garbage).unwrap_err();
        assert!(matches!(err, Error::InvalidWireFormat(_)));
    }

    #[test]
    fn datatype_json_renders_name_not_number() {
        let m = metric(Datatype::DoubleArray, Value::Double(0.0));
        let json = m.datatype_json();
        assert_eq!(json["datatype"], "DoubleArray");
    }

    #[test]
    fn properties_decode_overwrites_by_index_not_append() {
        let props = wire::payload::PropertySet {
            keys: vec!["a".to_string(), "b".to_string()],
            values: vec![
                wire::payload::PropertyValue {
                    r#type: Some(3),
                    is_null: Some(false),
                    value: Some(wire::payload::property_value::Value::IntValue(1)),
                },
                wire::payload::PropertyValue {
                    r#type: Some(3),
                    is_null: Some(false),
                    value: Some(wire::payload::property_value::Value::IntValue(2)),
                },
            ],
        };
        let decoded = PropertySet::from_wire(props);
        assert_eq!(decoded.values.len(), 2);
        assert_eq!(decoded.values[0], PropertyValue::Int(1));
        assert_eq!(decoded.values[1], PropertyValue::Int(2));
    }

    #[test]
    fn json_round_trips_scalar_value_and_properties() {
        let mut m = metric(Datatype::Double, Value::Double(98.6));
        m.properties = Some(PropertySet {
            keys: vec!["unit".to_string()],
            values: vec![PropertyValue::String("degF".to_string())],
        });
        let json = m.to_json();
        assert_eq!(json["value"], 98.6);
        assert_eq!(json["properties"]["values"][0]["type"], 6);
        assert_eq!(json["properties"]["values"][0]["value"], "degF");

        let decoded = Metric::from_json(&json).unwrap();
        assert_eq!(decoded.value, Some(Value::Double(98.6)));
        assert_eq!(
            decoded.properties,
            Some(PropertySet {
                keys: vec!["unit".to_string()],
                values: vec![PropertyValue::String("degF".to_string())],
            })
        );
    }

    #[test]
    fn json_decode_rejects_unsupported_datatype_value() {
        let json = serde_json::json!({
            "name": "m",
            "datatype": "FloatArray",
            "value": [1.0, 2.0],
        });
        let err = Metric::from_json(&json).unwrap_err();
        assert!(matches!(err, Error::UnsupportedDatatype(Datatype::FloatArray)));
    }

    #[test]
    fn json_decode_rejects_extension_property_type() {
        let json = serde_json::json!({"type": 9, "is_null": false, "value": "x"});
        let raw: PropertyValueJson = serde_json::from_value(json).unwrap();
        let err = PropertyValue::from_json_struct(&raw).unwrap_err();
        assert!(matches!(err, Error::InvalidWireFormat(_)));
    }
}
