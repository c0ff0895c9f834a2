use thiserror::Error;

use troupe_serde::SerdeErr;

/// Errors that can occur while reading or writing persisted actor state
#[derive(Debug, Error)]
pub enum PersistError {
    /// The structured (JSON) form could not be parsed or produced
    #[error("Structured record error: {0}")]
    Json(#[from] serde_json::Error),

    /// The compact binary form could not be decoded
    #[error("Binary record error: {0}")]
    Binary(#[from] SerdeErr),

    /// The scene file could not be read from or written to disk
    #[error("Scene file I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
