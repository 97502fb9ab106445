use siebwerk_core::WorkerId;
use thiserror::Error;

/// Errors from the scheduling and transport layer.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("serialization error: {0}")]
    Serialization(#[from] rmp_serde::encode::Error),

    #[error("deserialization error: {0}")]
    Deserialization(#[from] rmp_serde::decode::Error),

    #[error("zeromq error: {0}")]
    Zmq(#[from] zeromq::ZmqError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no dispatch route for worker {0}")]
    UnknownWorker(WorkerId),

    #[error("config error: {0}")]
    Config(String),
}
