use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

use crate::models::analysis::{AnalyzeRequest, EmailRequest, NegotiationEmail, QuestionRequest};
use crate::responses::JsonResponse;
use crate::services::ai::ContractAi;
use crate::state::AppState;
use std::sync::Arc;

fn require_ai(app_state: &AppState) -> Result<Arc<dyn ContractAi>, Response> {
    app_state
        .ai
        .clone()
        .ok_or_else(|| JsonResponse::server_error("GEMINI_API_KEY is not set").into_response())
}

// POST /api/analyze
pub async fn analyze(
    State(app_state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Response {
    if req.contract_text.trim().is_empty() {
        return JsonResponse::bad_request("No contract text provided").into_response();
    }
    let ai = match require_ai(&app_state) {
        Ok(ai) => ai,
        Err(resp) => return resp,
    };

    match ai.analyze_contract(&req.contract_text).await {
        Ok(analysis) => Json(analysis).into_response(),
        Err(err) => {
            error!(?err, "contract analysis failed");
            JsonResponse::server_error(&format!("Analysis failed: {}", err)).into_response()
        }
    }
}

// POST /api/ask-question
pub async fn ask_question(
    State(app_state): State<AppState>,
    Json(req): Json<QuestionRequest>,
) -> Response {
    let ai = match require_ai(&app_state) {
        Ok(ai) => ai,
        Err(resp) => return resp,
    };

    match ai.answer_question(&req.question, &req.contract_text).await {
        Ok(answer) => Json(json!({ "question": req.question, "answer": answer })).into_response(),
        Err(err) => {
            error!(?err, "question answering failed");
            JsonResponse::server_error(&format!("Question answering failed: {}", err))
                .into_response()
        }
    }
}

// POST /api/generate-email
pub async fn generate_email(
    State(app_state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Response {
    let ai = match require_ai(&app_state) {
        Ok(ai) => ai,
        Err(resp) => return resp,
    };

    match ai
        .generate_email(&req.contract_text, &req.tone, req.issues.as_deref())
        .await
    {
        Ok(email) => Json(email).into_response(),
        Err(err) => {
            // Drafting still succeeds from the caller's point of view;
            // hand back a usable starting point instead of a failure.
            warn!(?err, tone = %req.tone, "email generation degraded to the canned draft");
            Json(fallback_email(&req.tone, &err.to_string())).into_response()
        }
    }
}

fn fallback_email(tone: &str, reason: &str) -> NegotiationEmail {
    NegotiationEmail {
        subject: format!(
            "Contract Review and Discussion - {} Approach",
            title_case(tone)
        ),
        body: format!(
            "I've reviewed the contract and would like to discuss some key points. Error in AI generation: {}",
            reason
        ),
        tone: tone.to_string(),
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
