use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use giveaway_engine::PlatformClient;
use giveaway_types::api::{CreateGiveawayResponse, ParticipationTokenResponse};
use giveaway_types::models::{GiveawayId, NewGiveaway};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AdminActor;

/// Create a giveaway. The acting operator becomes its creator, so the actor
/// header is mandatory here.
pub async fn create<P: PlatformClient>(
    State(state): State<AppState<P>>,
    Extension(AdminActor(actor)): Extension<AdminActor>,
    Json(new): Json<NewGiveaway>,
) -> ApiResult<impl IntoResponse> {
    let creator_id = actor.ok_or_else(|| ApiError {
        status: StatusCode::BAD_REQUEST,
        message: Some("x-actor-id header is required".into()),
    })?;
    let (giveaway, token) = state.engine.create_giveaway(creator_id, new).await?;
    Ok((StatusCode::CREATED, Json(CreateGiveawayResponse { giveaway, token })))
}

pub async fn get<P: PlatformClient>(
    State(state): State<AppState<P>>,
    Path(giveaway_id): Path<GiveawayId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.engine.giveaway(giveaway_id).await?))
}

pub async fn token<P: PlatformClient>(
    State(state): State<AppState<P>>,
    Path(giveaway_id): Path<GiveawayId>,
) -> ApiResult<impl IntoResponse> {
    let token = state.engine.participation_token(giveaway_id).await?;
    Ok(Json(ParticipationTokenResponse { giveaway_id, token }))
}

/// Manual draw. Repeating it is harmless: later calls report the stored winners.
pub async fn draw<P: PlatformClient>(
    State(state): State<AppState<P>>,
    Extension(AdminActor(actor)): Extension<AdminActor>,
    Path(giveaway_id): Path<GiveawayId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.engine.draw(actor, giveaway_id).await?))
}

pub async fn winners<P: PlatformClient>(
    State(state): State<AppState<P>>,
    Path(giveaway_id): Path<GiveawayId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.engine.winners(giveaway_id).await?))
}

pub async fn audit<P: PlatformClient>(
    State(state): State<AppState<P>>,
    Path(giveaway_id): Path<GiveawayId>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.engine.giveaway_audit(giveaway_id).await?))
}
