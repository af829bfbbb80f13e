use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid entry name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },
}
