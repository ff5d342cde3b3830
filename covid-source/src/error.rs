/// Error types for loading source tables
use thiserror::Error;

/// Main error type for source operations
#[derive(Error, Debug)]
pub enum SourceError {
    /// Both the remote source and the local fallback failed
    #[error("{resource} unavailable (primary: {primary}; fallback: {fallback})")]
    Unavailable {
        resource: String,
        primary: String,
        fallback: String,
    },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Server answered with a non-success status
    #[error("Bad response status {status} from {url}")]
    Status { url: String, status: u16 },

    /// Server answered with an empty body
    #[error("Empty response from {0}")]
    EmptyResponse(String),

    /// Crate built without the `api` feature
    #[error("Remote fetching is not enabled in this build")]
    RemoteDisabled,

    /// Failed to parse or write CSV data
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Failed to parse JSON data
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// File read/write failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required column is absent from a table
    #[error("Missing column {column} in {table}")]
    MissingColumn { table: String, column: String },

    /// Grouping other than county or state
    #[error("Unsupported groupby {0:?}, expected \"county\" or \"state\"")]
    InvalidGroupBy(String),
}

/// Type alias for Results using SourceError
pub type Result<T> = std::result::Result<T, SourceError>;
