use impact_types::MatchStatus;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage-layer errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record not found: {0}")]
    NotFound(String),

    /// The request itself is not a legal lifecycle move.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// The compare-and-swap found the record already terminal.
    #[error("match already finalized as {current}")]
    AlreadyFinalized { current: MatchStatus },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// True for both lifecycle violations. Neither is worth retrying.
    pub fn is_state_violation(&self) -> bool {
        matches!(
            self,
            StorageError::InvalidTransition(_) | StorageError::AlreadyFinalized { .. }
        )
    }
}
