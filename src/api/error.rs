use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

use super::types::ErrorResponse;
use crate::error::InferenceError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Missing 'question' field")]
    MissingQuestion,

    #[error("Invalid JSON body: {0}")]
    InvalidBody(String),

    #[error("Server is busy, try again later")]
    Busy,

    #[error("Generation failed: {0}")]
    Generation(#[from] InferenceError),

    #[error("Generation worker failed: {0}")]
    WorkerFailed(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingQuestion | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Busy => StatusCode::SERVICE_UNAVAILABLE,
            Self::Generation(_) | Self::WorkerFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("Rejected request: {}", self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
