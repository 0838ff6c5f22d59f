use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use giveaway_engine::EngineError;
use giveaway_types::api::ErrorResponse;

/// Handler error: a status code plus an optional message for the caller.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: Option<String>,
}

impl ApiError {
    pub fn status(status: StatusCode) -> Self {
        Self { status, message: None }
    }
}

impl From<StatusCode> for ApiError {
    fn from(status: StatusCode) -> Self {
        Self::status(status)
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::GiveawayNotFound(_) | EngineError::ParticipantNotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                message: Some(e.to_string()),
            },
            EngineError::Validation(msg) => {
                warn!("Rejected giveaway definition: {}", msg);
                Self {
                    status: StatusCode::UNPROCESSABLE_ENTITY,
                    message: Some(msg),
                }
            }
            EngineError::Store(_) | EngineError::Join(_) | EngineError::Token(_) => {
                error!("Engine failure: {}", e);
                Self::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.message {
            Some(error) => (self.status, Json(ErrorResponse { error })).into_response(),
            None => self.status.into_response(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
