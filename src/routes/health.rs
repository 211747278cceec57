use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::state::AppState;

// GET /
pub async fn root() -> Response {
    Json(json!({
        "message": "Contract AI Backend is running",
        "status": "healthy",
    }))
    .into_response()
}

// GET /health
pub async fn health_check(State(app_state): State<AppState>) -> Response {
    Json(json!({
        "status": "healthy",
        "service": "Contract AI Backend",
        "version": env!("CARGO_PKG_VERSION"),
        "gemini_configured": app_state.config.gemini_api_key.is_some(),
    }))
    .into_response()
}
