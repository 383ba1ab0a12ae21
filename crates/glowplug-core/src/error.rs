use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Sparkplug(#[from] sparkplug::Error),

    #[error("store command failed: {0}")]
    StoreCommandError(String),

    #[error("publish failed: {0}")]
    PublishError(String),

    #[error("worker pool stopped")]
    WorkerStopped,

    #[error("ingress queue full")]
    QueueFull,
}
