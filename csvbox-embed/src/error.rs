//! Error types for the embed controller.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unsafe embed url '{url}': {reason}")]
    UnsafeUrl { url: String, reason: String },

    #[error("failed to read config file {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("render surface error: {0}")]
    Surface(String),
}

/// Result type for embed operations.
pub type EmbedResult<T> = Result<T, EmbedError>;
