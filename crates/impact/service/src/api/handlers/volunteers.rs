//! Volunteer-facing handlers

use crate::api::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use impact_ranking::RankedCause;
use impact_types::{ImpactStanding, Match, VolunteerId};
use serde::{Deserialize, Serialize};

/// Largest `k` a caller may ask for
pub const MAX_RANKING_K: usize = 100;

/// Ranking query params
#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    pub k: Option<usize>,
}

/// Ranking response
#[derive(Debug, Serialize)]
pub struct RankingResponse {
    pub volunteer_id: VolunteerId,
    pub causes: Vec<RankedCause>,
}

/// Rank causes for a volunteer
pub async fn rank_causes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RankingQuery>,
) -> ApiResult<Json<RankingResponse>> {
    if let Some(k) = query.k {
        if k > MAX_RANKING_K {
            return Err(ApiError::BadRequest(format!(
                "k must be at most {}",
                MAX_RANKING_K
            )));
        }
    }

    let volunteer_id = VolunteerId::new(id);
    let causes = state.engine.rank(&volunteer_id, query.k).await?;

    Ok(Json(RankingResponse {
        volunteer_id,
        causes,
    }))
}

/// Matches awaiting verification
pub async fn list_pending(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Match>>> {
    let pending = state.engine.pending_for(&VolunteerId::new(id)).await?;
    Ok(Json(pending))
}

/// Impact score and badge
pub async fn get_impact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ImpactStanding>> {
    let standing = state.engine.impact_standing(&VolunteerId::new(id)).await?;
    Ok(Json(standing))
}
