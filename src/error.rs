use thiserror::Error;

/// Specialisation of `std::Result`.
pub type Result<T, E = BlindTagError> = std::result::Result<T, E>;
pub type Error = BlindTagError;

#[derive(Error, Debug)]
/// error variants.
pub enum BlindTagError {
    /// An argument has the wrong shape, checked before any work is done.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("malformed hex input: {0}")]
    Format(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    /// The approved value was not signed by the target's key.
    #[error("unblinded signature does not verify against the target key")]
    VerificationFailed,

    #[error("modulus too small for padding: need {needed} bytes, have {available}")]
    MessageTooLong { needed: usize, available: usize },

    /// For `KeyValueStore` backends to report their own failures.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("rsa error")]
    Rsa(#[from] rsa::Error),

    #[error("record serialization failed")]
    Serialization(#[from] serde_json::Error),
}

impl From<hex::FromHexError> for BlindTagError {
    fn from(e: hex::FromHexError) -> Self {
        Self::Format(e.to_string())
    }
}

impl BlindTagError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        Self::InvalidArgument(what.into())
    }
}
