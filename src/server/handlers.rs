//! Route handlers. Each one calls a single `InferenceClient` operation and
//! reshapes the outcome into an HTTP response.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::models::{ChatRequest, ChatResponse, ErrorBody, HealthResponse};
use super::AppState;
use crate::inference::types::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::inference::{GenerationRequest, ModelInfo};

/// Failures surfaced to HTTP callers as `{"detail": ...}`.
#[derive(Debug)]
pub enum ApiError {
    /// 503: backend not reachable or model not loaded.
    ServiceUnavailable(String),
    /// 500: generation failed; carries the reason.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::ServiceUnavailable(detail) => (StatusCode::SERVICE_UNAVAILABLE, detail),
            ApiError::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    if state.client.check_health().await {
        Ok(Json(HealthResponse {
            status: "healthy".to_string(),
            model: state.client.model_name().to_string(),
        }))
    } else {
        Err(ApiError::ServiceUnavailable("LLM service not ready".to_string()))
    }
}

pub async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let request = GenerationRequest::new(payload.message)
        .max_tokens(payload.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS))
        .temperature(payload.temperature.unwrap_or(DEFAULT_TEMPERATURE));

    let result = state
        .client
        .generate(&request)
        .await
        .map_err(|e| ApiError::Internal(format!("Generation failed: {e}")))?;

    Ok(Json(ChatResponse {
        response: result.text,
        model: state.client.model_name().to_string(),
        tokens_used: None,
    }))
}

pub async fn model_info(State(state): State<AppState>) -> Json<ModelInfo> {
    Json(state.client.get_model_info().await)
}
