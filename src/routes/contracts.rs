use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tokio::fs;
use tracing::{error, warn};
use uuid::Uuid;

use crate::models::analysis::ContractAnalysis;
use crate::responses::JsonResponse;
use crate::state::AppState;
use crate::utils::extract::extract_text;

const ALLOWED_EXTENSIONS: [&str; 3] = [".pdf", ".docx", ".txt"];
const PREVIEW_CHARS: usize = 1000;

fn file_extension(filename: &str) -> Option<&'static str> {
    let lower = filename.to_lowercase();
    ALLOWED_EXTENSIONS
        .iter()
        .find(|ext| lower.ends_with(**ext))
        .copied()
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

// POST /api/upload
pub async fn upload_contract(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let mut filename: Option<String> = None;
    let mut content: Option<axum::body::Bytes> = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() == Some("file") {
                    filename = field.file_name().map(str::to_string);
                    match field.bytes().await {
                        Ok(bytes) => content = Some(bytes),
                        Err(err) => {
                            warn!(?err, "failed to read uploaded file body");
                            return JsonResponse::bad_request("Error reading uploaded file")
                                .into_response();
                        }
                    }
                }
            }
            Ok(None) => break,
            Err(_) => {
                return JsonResponse::bad_request("Invalid multipart payload").into_response()
            }
        }
    }

    let (Some(filename), Some(content)) = (filename, content) else {
        return JsonResponse::bad_request("No file provided").into_response();
    };
    let Some(extension) = file_extension(&filename) else {
        return JsonResponse::bad_request("Unsupported file type. Allowed: .pdf, .docx, .txt")
            .into_response();
    };

    let stored_as = format!("{}{}", Uuid::new_v4(), extension);
    let dir = &app_state.config.upload_dir;
    if let Err(err) = fs::create_dir_all(dir).await {
        error!(?err, dir = %dir.display(), "failed to create upload directory");
        return JsonResponse::server_error("Error storing file").into_response();
    }
    if let Err(err) = fs::write(dir.join(&stored_as), &content).await {
        error!(?err, %stored_as, "failed to persist upload");
        return JsonResponse::server_error("Error storing file").into_response();
    }

    let text = match extract_text(&filename, &content) {
        Ok(text) => text,
        Err(err) => {
            return JsonResponse::bad_request(&format!("Error extracting text: {}", err))
                .into_response()
        }
    };

    // An AI failure degrades to a placeholder; the upload itself stays
    // successful.
    let analysis = match &app_state.ai {
        Some(ai) => match ai.analyze_contract(&text).await {
            Ok(analysis) => analysis,
            Err(err) => {
                warn!(?err, "analysis failed for upload");
                ContractAnalysis::failed(&err.to_string())
            }
        },
        None => ContractAnalysis::failed("GEMINI_API_KEY is not set"),
    };

    Json(json!({
        "message": "Contract uploaded and analyzed successfully",
        "filename": filename,
        "saved_as": stored_as,
        "size": content.len(),
        "extracted_text": preview(&text, PREVIEW_CHARS),
        "analysis": analysis,
    }))
    .into_response()
}

fn unix_seconds(meta: &std::fs::Metadata) -> i64 {
    meta.created()
        .or_else(|_| meta.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// GET /api/contracts
pub async fn list_contracts(State(app_state): State<AppState>) -> Response {
    let mut contracts = Vec::new();

    // A missing directory just means nothing has been uploaded yet.
    if let Ok(mut entries) = fs::read_dir(&app_state.config.upload_dir).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            let extension = std::path::Path::new(&name)
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default();
            contracts.push(json!({
                "filename": name,
                "size": meta.len(),
                "created_at": unix_seconds(&meta),
                "extension": extension,
            }));
        }
    }

    Json(json!({ "contracts": contracts, "count": contracts.len() })).into_response()
}

// DELETE /api/contracts/{filename}
pub async fn delete_contract(
    State(app_state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return JsonResponse::bad_request("Invalid filename").into_response();
    }

    let path = app_state.config.upload_dir.join(&filename);
    match fs::remove_file(&path).await {
        Ok(()) => Json(json!({
            "message": format!("Contract {} deleted successfully", filename)
        }))
        .into_response(),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            JsonResponse::not_found("Contract not found").into_response()
        }
        Err(err) => {
            error!(?err, %filename, "failed to delete contract");
            JsonResponse::server_error("Error deleting contract").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::memory_credit_ledger::MemoryCreditLedger;
    use crate::db::memory_webhook_event_log::MemoryWebhookEventLog;
    use crate::services::ai::MockContractAi;
    use axum::body::Body;
    use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
    use axum::routing::{delete, get, post};
    use axum::Router;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "test-boundary-7MA4YWxk";

    fn test_state(upload_dir: PathBuf) -> AppState {
        AppState {
            credits: Arc::new(MemoryCreditLedger::new()),
            event_log: Arc::new(MemoryWebhookEventLog::new()),
            ai: Some(Arc::new(MockContractAi::new())),
            config: Arc::new(Config {
                frontend_origin: "http://localhost:3000".into(),
                database_url: None,
                webhook_secret: None,
                checkout_base: crate::config::DEFAULT_CHECKOUT_BASE.into(),
                pro_product_id: None,
                return_url: None,
                gemini_api_key: Some("test-key".into()),
                gemini_model: crate::config::DEFAULT_GEMINI_MODEL.into(),
                upload_dir,
            }),
        }
    }

    fn test_router(state: AppState) -> Router {
        Router::new()
            .route("/api/upload", post(upload_contract))
            .route("/api/contracts", get(list_contracts))
            .route("/api/contracts/{filename}", delete(delete_contract))
            .with_state(state)
    }

    fn temp_upload_dir() -> PathBuf {
        std::env::temp_dir().join(format!("contractai-test-{}", Uuid::new_v4()))
    }

    fn multipart_request(filename: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: text/plain\r\n\r\n{c}\r\n--{b}--\r\n",
            b = BOUNDARY,
            f = filename,
            c = content,
        );
        Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn upload_stores_extracts_and_analyzes() {
        let dir = temp_upload_dir();
        let app = test_router(test_state(dir.clone()));

        let resp = app
            .oneshot(multipart_request("contract.txt", "Payment due in 30 days."))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["message"], "Contract uploaded and analyzed successfully");
        assert_eq!(json["filename"], "contract.txt");
        assert_eq!(json["extracted_text"], "Payment due in 30 days.");
        assert_eq!(json["analysis"]["risk_score"], 42);

        let saved_as = json["saved_as"].as_str().unwrap();
        assert!(saved_as.ends_with(".txt"));
        assert!(dir.join(saved_as).exists());

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn upload_rejects_unsupported_extensions() {
        let app = test_router(test_state(temp_upload_dir()));
        let resp = app
            .oneshot(multipart_request("contract.rtf", "{}"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let json = body_json(resp).await;
        assert_eq!(json["detail"], "Unsupported file type. Allowed: .pdf, .docx, .txt");
    }

    #[tokio::test]
    async fn upload_without_a_file_field_is_rejected() {
        let app = test_router(test_state(temp_upload_dir()));
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nhello\r\n--{b}--\r\n",
            b = BOUNDARY,
        );
        let req = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let json = body_json(resp).await;
        assert_eq!(json["detail"], "No file provided");
    }

    #[tokio::test]
    async fn list_and_delete_round_trip() {
        let dir = temp_upload_dir();
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("a.txt"), b"one").await.unwrap();
        tokio::fs::write(dir.join("b.pdf"), b"two").await.unwrap();

        let app = test_router(test_state(dir.clone()));

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/contracts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["count"], 2);

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/contracts/a.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["message"], "Contract a.txt deleted successfully");

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/contracts/a.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn delete_rejects_path_traversal() {
        let app = test_router(test_state(temp_upload_dir()));
        let resp = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/contracts/..%2Fsecrets.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
