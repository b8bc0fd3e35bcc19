use thiserror::Error;

/// Errors raised while ingesting an uploaded dataset. No summary is produced
/// and history is left untouched when any of these is returned.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("column '{column}' has no numeric values in a non-empty table")]
    EmptyColumn { column: String },

    #[error("history store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised by a history store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
