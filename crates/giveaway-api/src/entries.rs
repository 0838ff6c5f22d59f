use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

use giveaway_db::models::Exclusion;
use giveaway_engine::PlatformClient;
use giveaway_types::api::{ExcludeEntryResponse, SubmitEntryRequest, SubmitEntryResponse};
use giveaway_types::models::EntryId;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AdminActor;

/// Participant-facing entry trigger. Every outcome, refusals included, is a
/// 200 with the outcome tag in the body.
pub async fn submit_entry<P: PlatformClient>(
    State(state): State<AppState<P>>,
    Json(req): Json<SubmitEntryRequest>,
) -> ApiResult<impl IntoResponse> {
    let outcome = state
        .engine
        .submit_entry(&req.token, req.participant_id, req.handle)
        .await?;
    debug!(participant = req.participant_id, outcome = outcome.tag(), "Entry submission handled");
    Ok(Json(SubmitEntryResponse::from(outcome)))
}

pub async fn exclude_entry<P: PlatformClient>(
    State(state): State<AppState<P>>,
    Path(entry_id): Path<EntryId>,
    Extension(AdminActor(actor)): Extension<AdminActor>,
) -> ApiResult<impl IntoResponse> {
    match state.engine.exclude_entry(actor, entry_id).await? {
        Exclusion::Excluded | Exclusion::AlreadyExcluded => Ok(Json(ExcludeEntryResponse {
            entry_id,
            excluded: true,
        })),
        Exclusion::NotFound => Err(ApiError::status(StatusCode::NOT_FOUND)),
    }
}
