//! Error types for Cairn
//!
//! `CairnError` covers failures raised below the management layer (storage,
//! locking, membership). The management layer maps them onto status codes.

/// Application-specific error types
#[derive(thiserror::Error, Debug)]
pub enum CairnError {
    #[error("caused: {0}")]
    IllegalArgument(String),

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("'{0}' not found")]
    NotFound(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl CairnError {
    /// Whether the error signals a state problem the caller cannot fix by changing input
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, CairnError::IllegalState(_))
    }
}

/// Locate a `CairnError` inside an `anyhow` chain
pub fn find_cairn_error(err: &anyhow::Error) -> Option<&CairnError> {
    err.chain().find_map(|e| e.downcast_ref::<CairnError>())
}
