/// Errors from entry store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the journal file. The failed transaction was not applied.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An entry could not be serialized for writing.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored record could not be decoded.
    #[error("corrupt record {name:?}: {reason}")]
    CorruptRecord { name: String, reason: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
