use thiserror::Error;

/// Result type for trust lookups against the reputation collaborator.
pub type TrustResult<T> = Result<T, TrustError>;

/// Failures talking to a trust source. The gate never surfaces these to
/// callers; they decide between a stale verdict and the fail-closed default.
#[derive(Debug, Error)]
pub enum TrustError {
    #[error("trust source unavailable: {0}")]
    Unavailable(String),

    #[error("trust fetch timed out after {0}ms")]
    Timeout(u64),

    #[error("invalid trust response: {0}")]
    InvalidResponse(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
