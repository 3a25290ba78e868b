use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;

use mq_common::api::{ComputeRequest, ListQuery, MatchResponse};
use mq_common::db::{self, MatchGrouping, MatchListFilter};
use mq_common::lifecycle::MatchStatus;
use mq_common::matching::{ScoringConfig, Tier};
use mq_common::rescan::ScoreUpsert;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::pagination::{validate_pagination, DEFAULT_LIMIT};
use crate::SharedState;

fn parse_filter(query: &ListQuery) -> Result<MatchListFilter, ApiError> {
    let tier = query
        .tier
        .as_deref()
        .map(str::parse::<Tier>)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let status = query
        .status
        .as_deref()
        .map(str::parse::<MatchStatus>)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let group_by = match query.group_by.as_deref() {
        None | Some("investor") => MatchGrouping::Investor,
        Some("target") => MatchGrouping::Target,
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "group_by must be investor or target, got {other}"
            )));
        }
    };

    let (limit, offset) = validate_pagination(
        query.limit.unwrap_or(DEFAULT_LIMIT),
        query.offset.unwrap_or(0),
    )?;

    Ok(MatchListFilter {
        min_score: query.min_score,
        tier,
        status,
        industry: query.industry.clone(),
        country: query.country.clone(),
        group_by,
        limit,
        offset,
    })
}

pub async fn list_matches(
    State(state): State<SharedState>,
    _auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<MatchResponse>>, ApiError> {
    let filter = parse_filter(&query)?;

    let records = db::list_matches(&state.pool, &filter).await?;

    Ok(Json(records.into_iter().map(MatchResponse::from).collect()))
}

pub async fn get_match(
    State(state): State<SharedState>,
    Path(match_id): Path<i64>,
    _auth: AuthUser,
) -> Result<Json<MatchResponse>, ApiError> {
    let record = db::fetch_match_by_id(&state.pool, match_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("match {match_id} not found")))?;

    Ok(Json(MatchResponse::from(record)))
}

/// On-demand scoring of a single pair. The result is persisted through the
/// same upsert path as a rescan, so review fields survive.
pub async fn compute_match(
    State(state): State<SharedState>,
    _auth: AuthUser,
    Json(request): Json<ComputeRequest>,
) -> Result<Json<MatchResponse>, ApiError> {
    let config = ScoringConfig {
        weights: request.weights.unwrap_or(state.scoring.weights),
        ..state.scoring.clone()
    };

    let investor = db::fetch_investor(&state.pool, request.investor_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("investor {} not found", request.investor_id))
        })?;
    let target = db::fetch_target(&state.pool, request.target_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("target {} not found", request.target_id)))?;

    let score = state.engine.compute(&config, &investor, &target)?;
    let upsert = ScoreUpsert::from_score(request.investor_id, request.target_id, &score, Utc::now());
    db::upsert_match_scores(&state.pool, &upsert).await?;

    let record = db::fetch_match_by_pair(&state.pool, request.investor_id, request.target_id)
        .await?
        .ok_or_else(|| ApiError::Internal("match row missing after upsert".into()))?;

    Ok(Json(MatchResponse::from(record)))
}
