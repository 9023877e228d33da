use thiserror::Error;

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level failure reported by the executor. Never retried internally.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The store accepted the request but reported an error for it.
    #[error("Database error: {0}")]
    Database(String),

    #[error("Point buffer is full (capacity={capacity})")]
    BufferFull { capacity: usize },

    #[error("Invalid point: {0}")]
    InvalidPoint(String),

    /// A single row failed to convert. Only returned under [`ParsePolicy::Strict`].
    ///
    /// [`ParsePolicy::Strict`]: crate::convert::ParsePolicy::Strict
    #[error("Malformed row {row} (column {column}) in series '{series}': {details}")]
    MalformedRow {
        series: String,
        row: usize,
        column: usize,
        details: String,
    },

    #[error("Cannot compute statistics over empty series '{field}'")]
    EmptySeries { field: String },

    #[error("Serialization Error: {0}")]
    Serialization(String),

    #[error("Configuration Error: {0}")]
    ConfigError(String),
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        ClientError::ConfigError(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
