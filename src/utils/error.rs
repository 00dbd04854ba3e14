//! The `error` module defines the error taxonomy of the dataplane.
//!
//! Startup errors (`Config`, `Connect`) abort the process. Steady-state
//! errors on a single message (`Decode`, `Classify`, a failed reply
//! connection) are logged by the caller and the message is dropped.

use thiserror::Error;

use crate::frame::FrameError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("cannot connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("decode error: {0}")]
    Decode(#[from] FrameError),

    #[error("classify error: {0}")]
    Classify(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("broker client error: {0}")]
    Broker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    pub fn connect(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Error::Connect {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}
