use thiserror::Error;
use wpaste_types::TypeError;

/// A malformed request. Rejected before any state is touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("payload is required")]
    MissingPayload,

    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("invalid TTL {0:?}: expected whole seconds")]
    MalformedTtl(String),

    #[error("TTL must not be negative, got {0}")]
    NegativeTtl(i64),

    #[error(transparent)]
    InvalidName(#[from] TypeError),
}

#[derive(Debug, Error)]
pub enum PasteError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// The name was never allocated, or the entry was deleted or swept.
    #[error("entry not found: {0}")]
    NotFound(String),

    /// The entry still exists but its TTL has elapsed.
    #[error("entry expired: {0}")]
    Gone(String),

    /// A required secret was missing or wrong; callers are not told which.
    #[error("unauthorized")]
    Unauthorized,

    /// A caller-chosen name is already in use.
    #[error("name already taken: {0}")]
    Conflict(String),

    #[error("no free name found after {attempts} attempts")]
    NamespaceExhausted { attempts: u32 },

    #[error("credential error: {0}")]
    Credential(#[from] wpaste_crypto::GuardError),

    #[error("store error: {0}")]
    Store(#[from] wpaste_store::StoreError),
}

impl From<TypeError> for PasteError {
    fn from(e: TypeError) -> Self {
        Self::Validation(e.into())
    }
}

pub type PasteResult<T> = Result<T, PasteError>;
