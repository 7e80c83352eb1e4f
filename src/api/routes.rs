use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use super::error::ApiError;
use super::types::*;
use super::AppState;
use crate::device::device_label;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/ask", post(ask))
        .route("/health", get(health_check))
        // Questions are not length-limited.
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.host.model_id().to_string(),
        device: device_label(state.host.device()).to_string(),
        available_slots: state.admission.available_permits(),
    })
}

async fn ask(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<AskResponse>, ApiError> {
    let request = parse_ask_request(&body)?;
    let question = request
        .question()
        .ok_or(ApiError::MissingQuestion)?
        .to_string();

    let permit = state
        .admission
        .clone()
        .try_acquire_owned()
        .map_err(|_| ApiError::Busy)?;

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("ask", %request_id);
    info!(parent: &span, "Question received: {} chars", question.len());

    let host = state.host.clone();
    let worker_span = span.clone();
    let output = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        let _entered = worker_span.enter();
        host.generate(&question)
    })
    .await
    .map_err(|e| ApiError::WorkerFailed(e.to_string()))??;

    info!(
        parent: &span,
        "Answered: prompt_tokens={}, new_tokens={}, {:.2} tok/s, {}ms",
        output.prompt_tokens,
        output.tokens.len(),
        output.tokens_per_second,
        output.total_time_ms
    );

    Ok(Json(AskResponse {
        answer: output.text,
    }))
}

/// An empty body counts as a request without a question. Any JSON value is
/// accepted; only a string `question` member is used.
fn parse_ask_request(body: &[u8]) -> Result<AskRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(AskRequest::default());
    }

    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| ApiError::InvalidBody(e.to_string()))?;

    Ok(AskRequest {
        question: value
            .get("question")
            .and_then(|q| q.as_str())
            .map(str::to_string),
    })
}
