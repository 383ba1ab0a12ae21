use thiserror::Error;

/// Result type alias for Sparkplug operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds produced by topic parsing, payload decoding, and coercion.
#[derive(Error, Debug)]
pub enum Error {
    #[error("topic is empty")]
    EmptyTopic,

    #[error("invalid sparkplug topic: {0}")]
    InvalidTopic(String),

    #[error("unknown datatype: {0}")]
    UnknownDatatype(String),

    #[error("unsupported datatype: {0:?}")]
    UnsupportedDatatype(crate::datatype::Datatype),

    #[error("metric is nil")]
    NilMetric,

    #[error("metric name is empty")]
    EmptyMetricName,

    #[error("invalid wire-format data: {0}")]
    InvalidWireFormat(String),
}

impl From<prost::DecodeError> for Error {
    fn from(e: prost::DecodeError) -> Self {
        Error::InvalidWireFormat(e.to_string())
    }
}
