use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] glowplug_core::Error),

    #[error(transparent)]
    Sparkplug(#[from] sparkplug::Error),

    #[error("mqtt connect failed: {0}")]
    MqttConnect(String),

    #[error("http bind failed: {0}")]
    HttpBind(String),

    #[error("opcua error: {0}")]
    Opcua(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
