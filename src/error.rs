/// Errors raised by the config and history layers.
///
/// The fight core never fails; everything here is I/O or decoding.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("failed to read {path}: {source}")]
    Read {
        path:   PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path:   PathBuf,
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("history writer is not running")]
    WriterClosed,
}

pub type Result<T> = std::result::Result<T, TrackerError>;
