//! Error types for impact-service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use impact_ledger::VerificationError;
use impact_ranking::{CatalogError, RankingError};
use impact_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

/// Errors of the engine facade
#[derive(Debug, Error)]
pub enum EngineError {
    /// Unknown volunteer, cause or match
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Ranking(#[from] RankingError),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// Collaborator could not be constructed
    #[error("Bootstrap error: {0}")]
    Bootstrap(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Lifecycle violation on a match
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Verifier failed the trust check; the match is now rejected
    #[error("Trust denied: {0}")]
    TrustDenied(String),

    /// Anchoring did not complete; the whole call may be retried
    #[error("Anchoring unavailable: {0}")]
    AnchorUnavailable(String),

    #[error("Anchor rejected: {0}")]
    AnchorRejected(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<VerificationError> for ApiError {
    fn from(err: VerificationError) -> Self {
        let message = err.to_string();
        match err {
            VerificationError::NotFound(_) => ApiError::NotFound(message),
            VerificationError::InvalidTransition(_) | VerificationError::AlreadyFinalized { .. } => {
                ApiError::Conflict(message)
            }
            VerificationError::TrustDenied { .. } => ApiError::TrustDenied(message),
            VerificationError::RetriableAnchorFailure(_) => ApiError::AnchorUnavailable(message),
            VerificationError::AnchorRejected(_) => ApiError::AnchorRejected(message),
            VerificationError::Storage(storage) => storage.into(),
            VerificationError::Internal(_) => ApiError::Internal(message),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => ApiError::NotFound(msg),
            err if err.is_state_violation() => ApiError::Conflict(err.to_string()),
            err => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<RankingError> for ApiError {
    fn from(err: RankingError) -> Self {
        match err {
            RankingError::VolunteerNotFound(id) => {
                ApiError::NotFound(format!("Volunteer {} not found", id))
            }
            RankingError::Catalog(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound(msg) => ApiError::NotFound(msg),
            EngineError::Ranking(err) => err.into(),
            EngineError::Verification(err) => err.into(),
            EngineError::Storage(err) => err.into(),
            EngineError::Catalog(err) => ApiError::Internal(err.to_string()),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::TrustDenied(_) => (StatusCode::FORBIDDEN, "TRUST_DENIED"),
            ApiError::AnchorUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "ANCHOR_UNAVAILABLE")
            }
            ApiError::AnchorRejected(_) => (StatusCode::UNPROCESSABLE_ENTITY, "ANCHOR_REJECTED"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let details = match &self {
            ApiError::AnchorUnavailable(_) => Some(serde_json::json!({ "retriable": true })),
            _ => None,
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;
    use impact_types::{MatchId, MatchStatus, OrgId};

    fn status_of(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            status_of(ApiError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ApiError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_verification_errors_map_to_http() {
        assert_eq!(
            status_of(VerificationError::NotFound("m-1".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(VerificationError::AlreadyFinalized {
                match_id: MatchId::new("m-1"),
                status: MatchStatus::Verified,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(VerificationError::InvalidTransition("bad".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(VerificationError::TrustDenied {
                org_id: OrgId::new("org-x"),
                reason: "score 10".to_string(),
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(VerificationError::RetriableAnchorFailure("down".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(VerificationError::AnchorRejected("paused".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(VerificationError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_engine_errors_map_through() {
        assert_eq!(
            status_of(EngineError::Ranking(RankingError::VolunteerNotFound(
                "v-1".to_string()
            ))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(EngineError::Storage(StorageError::AlreadyFinalized {
                current: MatchStatus::Rejected,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(EngineError::Catalog(CatalogError::Backend("x".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
