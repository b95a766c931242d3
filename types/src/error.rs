//! Top-level error type shared across crates.

use thiserror::Error;

/// Common error type for the Accord agreement layer.
#[derive(Debug, Error)]
pub enum AccordError {
    #[error("invalid consensus parameters: {0}")]
    InvalidParams(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("no agents registered for {0}")]
    NoAgents(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}
