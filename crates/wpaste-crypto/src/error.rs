/// Errors from credential hashing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GuardError {
    /// The configured Argon2 cost parameters are out of range.
    #[error("invalid hash parameters: {0}")]
    InvalidParams(String),

    /// Hash derivation failed.
    #[error("hashing failed: {0}")]
    Hash(String),
}
