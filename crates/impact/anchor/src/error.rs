use impact_types::ProofHashError;
use thiserror::Error;

/// Result type for anchoring operations.
pub type AnchorResult<T> = Result<T, AnchorError>;

/// Anchoring failures, split by whether a retry can help.
#[derive(Debug, Error)]
pub enum AnchorError {
    /// Network hiccup, overloaded ledger, timeout.
    #[error("transient anchor failure: {0}")]
    Transient(String),

    /// The ledger refused the submission.
    #[error("anchor rejected: {0}")]
    Permanent(String),

    #[error("malformed proof hash: {0}")]
    MalformedHash(#[from] ProofHashError),

    /// Every allowed attempt failed transiently.
    #[error("anchor failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

impl AnchorError {
    /// Whether retrying the whole operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AnchorError::Transient(_) | AnchorError::Exhausted { .. }
        )
    }
}
