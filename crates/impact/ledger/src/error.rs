use crate::stage::StageError;
use impact_storage::StorageError;
use impact_types::{MatchId, MatchStatus, OrgId};
use thiserror::Error;

/// Verification ledger errors.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("match {match_id} already finalized as {status}")]
    AlreadyFinalized {
        match_id: MatchId,
        status: MatchStatus,
    },

    /// Terminal: the match has been rejected.
    #[error("organization {org_id} denied: {reason}")]
    TrustDenied { org_id: OrgId, reason: String },

    /// The match is still `interested`; retrying `verify` is safe.
    #[error("anchoring failed, retry later: {0}")]
    RetriableAnchorFailure(String),

    #[error("anchor rejected the proof: {0}")]
    AnchorRejected(String),

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl VerificationError {
    pub(crate) fn from_storage(match_id: &MatchId, err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => VerificationError::NotFound(msg),
            StorageError::InvalidTransition(msg) => VerificationError::InvalidTransition(msg),
            StorageError::AlreadyFinalized { current } => VerificationError::AlreadyFinalized {
                match_id: match_id.clone(),
                status: current,
            },
            other => VerificationError::Storage(other),
        }
    }

    /// Whether the caller may retry the whole operation.
    pub fn is_retriable(&self) -> bool {
        matches!(self, VerificationError::RetriableAnchorFailure(_))
    }
}

impl From<StageError> for VerificationError {
    fn from(err: StageError) -> Self {
        VerificationError::Internal(err.to_string())
    }
}
