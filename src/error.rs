//! Crate-wide error type.
//!
//! Mirrors the teacher's `DbError`: one flat `thiserror` enum, `Result<T>`
//! alias, and conversions (`#[from]`) at the boundaries where standard
//! library errors cross into ours.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReplicaError>;

#[derive(Error, Debug)]
pub enum ReplicaError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed input: {0}")]
    Malformed(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::error::EncodeError> for ReplicaError {
    fn from(e: bincode::error::EncodeError) -> Self {
        ReplicaError::Serialization(e.to_string())
    }
}

impl From<bincode::error::DecodeError> for ReplicaError {
    fn from(e: bincode::error::DecodeError) -> Self {
        ReplicaError::Serialization(e.to_string())
    }
}
