//! Match lifecycle handlers

use crate::api::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, State},
    Json,
};
use impact_ledger::VerifyRequest;
use impact_types::{CauseId, Match, MatchId, OrgId, ProofRecord, VolunteerId};
use serde::Deserialize;

/// Create match request
#[derive(Debug, Deserialize)]
pub struct CreateMatchRequest {
    pub volunteer_id: String,
    pub cause_id: String,
}

/// Record interest in a cause
pub async fn create_match(
    State(state): State<AppState>,
    Json(request): Json<CreateMatchRequest>,
) -> ApiResult<Json<Match>> {
    let volunteer_id = required("volunteer_id", request.volunteer_id)?;
    let cause_id = required("cause_id", request.cause_id)?;

    let created = state
        .engine
        .create_match(&VolunteerId::new(volunteer_id), &CauseId::new(cause_id))
        .await?;

    Ok(Json(created))
}

/// Get a specific match
pub async fn get_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Match>> {
    let found = state.engine.get_match(&MatchId::new(id)).await?;
    Ok(Json(found))
}

/// Verify match request
#[derive(Debug, Deserialize)]
pub struct VerifyMatchRequest {
    pub verifier_org: String,
    #[serde(default)]
    pub admin_override: bool,
}

/// Issue the proof for a match
pub async fn verify_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<VerifyMatchRequest>,
) -> ApiResult<Json<ProofRecord>> {
    let verifier_org = required("verifier_org", request.verifier_org)?;

    let proof = state
        .engine
        .verify(VerifyRequest {
            match_id: MatchId::new(id),
            verifier_org: OrgId::new(verifier_org),
            admin_override: request.admin_override,
        })
        .await?;

    tracing::info!(match_id = %proof.match_id, reference = %proof.anchor_reference, "Match verified");
    Ok(Json(proof))
}

/// Deny match request
#[derive(Debug, Deserialize)]
pub struct DenyMatchRequest {
    pub verifier_org: String,
    #[serde(default)]
    pub reason: String,
}

/// Refuse a match
pub async fn deny_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<DenyMatchRequest>,
) -> ApiResult<Json<Match>> {
    let verifier_org = required("verifier_org", request.verifier_org)?;

    let denied = state
        .engine
        .deny(&MatchId::new(id), &OrgId::new(verifier_org), &request.reason)
        .await?;

    Ok(Json(denied))
}

fn required(field: &str, value: String) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}
