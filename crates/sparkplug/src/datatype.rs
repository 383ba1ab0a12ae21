//! The Sparkplug B datatype enumeration and its name<->number mapping.
//!
//! The numeric values match the Sparkplug B specification exactly; JSON
//! rendering uses the name, never the number (see `crate::payload`).

use crate::error::{Error, Result};

/// One of the ~30 Sparkplug B datatype kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Datatype {
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    Int64 = 4,
    UInt8 = 5,
    UInt16 = 6,
    UInt32 = 7,
    UInt64 = 8,
    Float = 9,
    Double = 10,
    Boolean = 11,
    String = 12,
    DateTime = 13,
    Text = 14,
    Uuid = 15,
    DataSet = 16,
    Bytes = 17,
    File = 18,
    Template = 19,
    PropertySet = 20,
    PropertySetList = 21,
    Int8Array = 22,
    Int16Array = 23,
    Int32Array = 24,
    Int64Array = 25,
    UInt8Array = 26,
    UInt16Array = 27,
    UInt32Array = 28,
    UInt64Array = 29,
    FloatArray = 30,
    DoubleArray = 31,
    BooleanArray = 32,
    StringArray = 33,
    DateTimeArray = 34,
    Unknown = 0,
}

impl Datatype {
    /// The canonical name used in JSON rendering, e.g. `"Int32"`, `"DoubleArray"`.
    pub fn name(self) -> &'static str {
        match self {
            Datatype::Int8 => "Int8",
            Datatype::Int16 => "Int16",
            Datatype::Int32 => "Int32",
            Datatype::Int64 => "Int64",
            Datatype::UInt8 => "UInt8",
            Datatype::UInt16 => "UInt16",
            Datatype::UInt32 => "UInt32",
            Datatype::UInt64 => "UInt64",
            Datatype::Float => "Float",
            Datatype::Double => "Double",
            Datatype::Boolean => "Boolean",
            Datatype::String => "String",
            Datatype::DateTime => "DateTime",
            Datatype::Text => "Text",
            Datatype::Uuid => "UUID",
            Datatype::DataSet => "DataSet",
            Datatype::Bytes => "Bytes",
            Datatype::File => "File",
            Datatype::Template => "Template",
            Datatype::PropertySet => "PropertySet",
            Datatype::PropertySetList => "PropertySetList",
            Datatype::Int8Array => "Int8Array",
            Datatype::Int16Array => "Int16Array",
            Datatype::Int32Array => "Int32Array",
            Datatype::Int64Array => "Int64Array",
            Datatype::UInt8Array => "UInt8Array",
            Datatype::UInt16Array => "UInt16Array",
            Datatype::UInt32Array => "UInt32Array",
            Datatype::UInt64Array => "UInt64Array",
            Datatype::FloatArray => "FloatArray",
            Datatype::DoubleArray => "DoubleArray",
            Datatype::BooleanArray => "BooleanArray",
            Datatype::StringArray => "StringArray",
            Datatype::DateTimeArray => "DateTimeArray",
            Datatype::Unknown => "Unknown",
        }
    }

    /// Parses a datatype by its canonical name. Fails with `UnknownDatatype`
    /// for anything not in the enumeration.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::name_table()
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, d)| *d)
            .ok_or_else(|| Error::UnknownDatatype(name.to_string()))
    }

    /// Parses a datatype from its wire-format numeric value.
    pub fn from_u32(n: u32) -> Result<Self> {
        Self::name_table()
            .iter()
            .find(|(_, d)| d.as_u32() == n)
            .map(|(_, d)| *d)
            .ok_or_else(|| Error::UnknownDatatype(n.to_string()))
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    fn name_table() -> &'static [(&'static str, Datatype)] {
        &[
            ("Int8", Datatype::Int8),
            ("Int16", Datatype::Int16),
            ("Int32", Datatype::Int32),
            ("Int64", Datatype::Int64),
            ("UInt8", Datatype::UInt8),
            ("UInt16", Datatype::UInt16),
            ("UInt32", Datatype::UInt32),
            ("UInt64", Datatype::UInt64),
            ("Float", Datatype::Float),
            ("Double", Datatype::Double),
            ("Boolean", Datatype::Boolean),
            ("String", Datatype::String),
            ("DateTime", Datatype::DateTime),
            ("Text", Datatype::Text),
            ("UUID", Datatype::Uuid),
            ("DataSet", Datatype::DataSet),
            ("Bytes", Datatype::Bytes),
            ("File", Datatype::File),
            ("Template", Datatype::Template),
            ("PropertySet", Datatype::PropertySet),
            ("PropertySetList", Datatype::PropertySetList),
            ("Int8Array", Datatype::Int8Array),
            ("Int16Array", Datatype::Int16Array),
            ("Int32Array", Datatype::Int32Array),
            ("Int64Array", Datatype::Int64Array),
            ("UInt8Array", Datatype::UInt8Array),
            ("UInt16Array", Datatype::UInt16Array),
            ("UInt32Array", Datatype::UInt32Array),
            ("UInt64Array", Datatype::UInt64Array),
            ("FloatArray", Datatype::FloatArray),
            ("DoubleArray", Datatype::DoubleArray),
            ("BooleanArray", Datatype::BooleanArray),
            ("StringArray", Datatype::StringArray),
            ("DateTimeArray", Datatype::DateTimeArray),
            ("Unknown", Datatype::Unknown),
        ]
    }
}

impl std::fmt::Display for Datatype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_round_trips_for_every_datatype() {
        let all = [
            Datatype::Int8,
            Datatype::Int16,
            Datatype::Int32,
            Datatype::Int64,
            Datatype::UInt8,
            Datatype::UInt16,
            Datatype::UInt32,
            Datatype::UInt64,
            Datatype::Float,
            Datatype::Double,
            Datatype::Boolean,
            Datatype::String,
            Datatype::DateTime,
            Datatype::Text,
            Datatype::Uuid,
            Datatype::DataSet,
            Datatype::Bytes,
            Datatype::File,
            Datatype::Template,
            Datatype::PropertySet,
            Datatype::PropertySetList,
            Datatype::Int8Array,
            Datatype::Int16Array,
            Datatype::Int32Array,
            Datatype::Int64Array,
            Datatype::UInt8Array,
            Datatype::UInt16Array,
            Datatype::UInt32Array,
            Datatype::UInt64Array,
            Datatype::FloatArray,
            Datatype::DoubleArray,
            Datatype::BooleanArray,
            Datatype::StringArray,
            Datatype::DateTimeArray,
        ];
        for dt in all {
            let name = dt.name();
            assert_eq!(Datatype::from_name(name).unwrap(), dt);
            assert_eq!(Datatype::from_u32(dt.as_u32()).unwrap(), dt);
        }
    }

    #[test]
    fn unknown_name_fails() {
        assert!(Datatype::from_name("NotARealType").is_err());
    }
}
