use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use giveaway_engine::PlatformClient;
use giveaway_types::api::{GateCheckRequest, GateCheckResponse};
use giveaway_types::models::ParticipantId;

use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::AdminActor;

/// Register the participant (or refresh their profile) and run the
/// mandatory-channel gate.
pub async fn gate_check<P: PlatformClient>(
    State(state): State<AppState<P>>,
    Json(req): Json<GateCheckRequest>,
) -> ApiResult<impl IntoResponse> {
    let verified = state
        .engine
        .verify_gate(req.participant_id, req.handle.as_deref(), req.locale.as_deref())
        .await?;
    Ok(Json(GateCheckResponse {
        participant_id: req.participant_id,
        verified,
    }))
}

pub async fn stats<P: PlatformClient>(
    State(state): State<AppState<P>>,
    Path(participant_id): Path<ParticipantId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.engine.participant_stats(participant_id).await?))
}

pub async fn ban<P: PlatformClient>(
    State(state): State<AppState<P>>,
    Path(participant_id): Path<ParticipantId>,
    Extension(AdminActor(actor)): Extension<AdminActor>,
) -> ApiResult<impl IntoResponse> {
    state.engine.ban_participant(actor, participant_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
