use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::responses::JsonResponse;
use crate::state::AppState;

// GET /api/credits/{email}
pub async fn get_credits(
    State(app_state): State<AppState>,
    Path(email): Path<String>,
) -> Response {
    match app_state.credits.get_credits(&email).await {
        Ok(credits) => Json(json!({
            "email": email.to_lowercase(),
            "credits": credits,
        }))
        .into_response(),
        Err(err) => {
            error!(?err, "failed to read credit balance");
            JsonResponse::server_error("Credit store unavailable").into_response()
        }
    }
}
