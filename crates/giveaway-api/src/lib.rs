pub mod entries;
pub mod error;
pub mod giveaways;
pub mod middleware;
pub mod participants;

use std::sync::Arc;

use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{get, post},
};

use giveaway_engine::{Engine, PlatformClient};

use crate::middleware::require_admin;

pub type AppState<P> = Arc<AppStateInner<P>>;

pub struct AppStateInner<P> {
    pub engine: Engine<P>,
    /// Bearer token guarding the `/admin` routes.
    pub admin_token: String,
}

pub fn router<P: PlatformClient>(state: AppState<P>) -> Router {
    let public_routes = Router::new()
        .route("/entries", post(entries::submit_entry::<P>))
        .route("/participants/gate", post(participants::gate_check::<P>))
        .route("/participants/{participant_id}/stats", get(participants::stats::<P>))
        .route("/health", get(health));

    let admin_routes = Router::new()
        .route("/admin/giveaways", post(giveaways::create::<P>))
        .route("/admin/giveaways/{giveaway_id}", get(giveaways::get::<P>))
        .route("/admin/giveaways/{giveaway_id}/token", post(giveaways::token::<P>))
        .route("/admin/giveaways/{giveaway_id}/draw", post(giveaways::draw::<P>))
        .route("/admin/giveaways/{giveaway_id}/winners", get(giveaways::winners::<P>))
        .route("/admin/giveaways/{giveaway_id}/audit", get(giveaways::audit::<P>))
        .route("/admin/entries/{entry_id}/exclude", post(entries::exclude_entry::<P>))
        .route("/admin/participants/{participant_id}/ban", post(participants::ban::<P>))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_admin::<P>));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
