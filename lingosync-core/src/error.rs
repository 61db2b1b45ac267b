//! Error types for lingosync-core

use thiserror::Error;

/// Main error type for the lingosync-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed document, path, or import payload
    #[error("structural error at `{path}`: {message}")]
    Structural { path: String, message: String },

    /// Invalid regular expression in a query clause
    #[error("invalid pattern `{pattern}`: {message}")]
    Pattern { pattern: String, message: String },

    /// Remote document does not exist
    #[error("document not found: {0}")]
    NotFound(String),

    /// Network or transport failure talking to a document remote
    #[error("transport error: {0}")]
    Transport(String),

    /// Missing or rejected credentials
    #[error("authentication error: {0}")]
    Auth(String),

    /// Remote revision moved since it was read
    #[error("conflict on {path}: expected revision {expected}, found {actual}")]
    Conflict {
        path: String,
        expected: String,
        actual: String,
    },

    /// Suggestion provider failure
    #[error("suggestion provider error: {0}")]
    Provider(String),

    /// Provider failure while processing one chunk of a batch
    #[error("suggestion batch failed at chunk {chunk}: {source}")]
    Batch {
        chunk: usize,
        #[source]
        source: Box<Error>,
    },

    /// Project not found
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    /// Row not found
    #[error("row not found: {0}")]
    RowNotFound(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl Error {
    /// Create a structural error for a path
    pub fn structural(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Structural {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for lingosync-core
pub type Result<T> = std::result::Result<T, Error>;
