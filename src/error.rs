//! Error types for the retrieval engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("corrupt posting blob: {0}")]
    CorruptBlob(String),

    #[error("corrupt index file: {0}")]
    CorruptIndexFile(String),

    #[error("out of memory: {0}")]
    OutOfMemory(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}
