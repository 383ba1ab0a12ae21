//! Sparkplug B topic grammar, binary payload codec, and datatype coercion.
//!
//! This crate covers the wire-format layer of the bridge: parsing and
//! composing `spBv1.0/...` topics, decoding/encoding the length-delimited
//! protobuf payload, mapping datatypes to their canonical JSON names, and
//! coercing a metric's tagged-union value into a canonical JSON scalar.

pub mod coerce;
pub mod datatype;
pub mod error;
pub mod keys;
pub mod payload;
pub mod sequence;
pub mod topic;

pub use datatype::Datatype;
pub use error::{Error, Result};
pub use payload::{Metric, Payload, PropertyValue, Value};
pub use topic::{Command, Topic};

/// The fixed Sparkplug B namespace literal.
pub const NAMESPACE: &str = "spBv1.0";
/// The SCADA-host liveness payload literal carried by a STATE death/will.
pub const STATE_OFFLINE: &str = "OFFLINE";
/// The SCADA-host liveness payload literal carried by a STATE birth.
pub const STATE_ONLINE: &str = "ONLINE";
