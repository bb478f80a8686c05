//! Verification audit handlers

use crate::api::state::AppState;
use crate::error::ApiResult;
use axum::{
    extract::{Query, State},
    Json,
};
use impact_storage::{QueryWindow, VerificationAttempt};
use serde::{Deserialize, Serialize};

/// Attempt listing query params
#[derive(Debug, Deserialize)]
pub struct AttemptsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Attempt listing response
#[derive(Debug, Serialize)]
pub struct AttemptsResponse {
    pub attempts: Vec<VerificationAttempt>,
    /// Whether the full hash chain recomputes cleanly
    pub chain_intact: bool,
}

/// List verification attempts, newest first
pub async fn list_attempts(
    State(state): State<AppState>,
    Query(query): Query<AttemptsQuery>,
) -> ApiResult<Json<AttemptsResponse>> {
    let attempts = state
        .engine
        .attempts(QueryWindow {
            limit: query.limit,
            offset: query.offset,
        })
        .await?;
    let chain_intact = state.engine.audit_chain_intact().await?;

    Ok(Json(AttemptsResponse {
        attempts,
        chain_intact,
    }))
}
