use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed batch artifact {}: {reason}", .path.display())]
    MalformedBatch { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, CollectorError>;
