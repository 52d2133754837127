//! Network error types.

use thiserror::Error;

/// Network-specific errors.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Transport-specific error.
    #[error("transport error: {0}")]
    Transport(String),
}
