use axum::{
    extract::{Path, State},
    Json,
};

use mq_common::api::{MatchResponse, TransitionRequest};
use mq_common::db::transition_match;
use mq_common::lifecycle::TransitionAction;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::SharedState;

/// Apply one review action to a match. Terminal statuses come back as 409.
pub async fn transition(
    State(state): State<SharedState>,
    Path(match_id): Path<i64>,
    auth: AuthUser,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<MatchResponse>, ApiError> {
    let action = request
        .action
        .parse::<TransitionAction>()
        .map_err(ApiError::BadRequest)?;
    let actor = resolve_actor(&request.actor, &auth.subject)?;

    let record = transition_match(
        &state.pool,
        match_id,
        action,
        actor,
        request.deal_id,
        request.notes.as_deref(),
    )
    .await?;

    Ok(Json(MatchResponse::from(record)))
}

/// The body's actor wins; an absent or blank actor falls back to the
/// authenticated subject.
fn resolve_actor<'a>(requested: &'a str, subject: &'a str) -> Result<&'a str, ApiError> {
    let requested = requested.trim();
    if !requested.is_empty() {
        return Ok(requested);
    }
    let subject = subject.trim();
    if subject.is_empty() {
        return Err(ApiError::BadRequest("actor is required".into()));
    }
    Ok(subject)
}
