// ReelMap Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReelMapError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("MHL error: {0}")]
    Mhl(String),

    #[error("Hash error: {0}")]
    Hash(String),

    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for ReelMapError {
    fn from(err: anyhow::Error) -> Self {
        ReelMapError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReelMapError>;
