use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use giveaway_engine::PlatformClient;
use giveaway_types::models::ParticipantId;

use crate::AppState;

/// Header naming the operator on whose behalf an admin request acts.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Operator id attached to admin requests, recorded as the audit actor.
#[derive(Debug, Clone, Copy)]
pub struct AdminActor(pub Option<ParticipantId>);

/// Check the admin bearer token and attach the acting operator.
pub async fn require_admin<P: PlatformClient>(
    State(state): State<AppState<P>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if state.admin_token.is_empty() || !bool::from(token.as_bytes().ct_eq(state.admin_token.as_bytes())) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let actor = match req.headers().get(ACTOR_HEADER) {
        None => None,
        Some(v) => Some(
            v.to_str()
                .ok()
                .and_then(|s| s.trim().parse::<ParticipantId>().ok())
                .ok_or(StatusCode::BAD_REQUEST)?,
        ),
    };

    req.extensions_mut().insert(AdminActor(actor));
    Ok(next.run(req).await)
}
