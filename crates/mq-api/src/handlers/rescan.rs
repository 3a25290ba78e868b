use axum::{extract::State, Json};
use tracing::info;

use mq_common::api::{RescanRequest, RescanResponse};
use mq_common::matching::ScoringConfig;
use mq_common::rescan::RescanOptions;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::SharedState;

/// Kick off a full rescan and wait for the summary. Returns 409 while a
/// previous run is still in flight.
pub async fn trigger(
    State(state): State<SharedState>,
    _auth: AuthUser,
    request: Option<Json<RescanRequest>>,
) -> Result<Json<RescanResponse>, ApiError> {
    let request = request.map(|Json(body)| body).unwrap_or_default();

    let config = ScoringConfig {
        weights: request.weights.unwrap_or(state.scoring.weights),
        ..state.scoring.clone()
    };
    let options = RescanOptions {
        batch_size: request
            .batch_size
            .unwrap_or(state.config.rescan_batch_size)
            .clamp(1, 10_000),
        include_dismissed: request.include_dismissed,
        ..RescanOptions::default()
    };

    let summary = state
        .orchestrator
        .rescan(&config, &options, &state.rescan_cancel)
        .await?;

    info!(
        updated = summary.updated_count,
        strong = summary.strong_match_count,
        skipped_dismissed = summary.skipped_dismissed,
        failed = summary.failed_pairs,
        cancelled = summary.cancelled,
        "rescan finished"
    );

    Ok(Json(RescanResponse::from(summary)))
}
