use axum::Json;
use axum::{extract::State, http::HeaderMap, response::IntoResponse, response::Response};
use serde_json::json;
use tracing::{error, info, warn};

use crate::models::payment_event::PaymentEvent;
use crate::responses::JsonResponse;
use crate::state::AppState;
use crate::utils::signature::WebhookVerifier;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("")
}

// POST /api/webhooks/dodo
pub async fn dodo_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    let Some(secret) = app_state.config.webhook_secret.as_deref() else {
        return JsonResponse::server_error("DODO_WEBHOOK_SECRET not configured").into_response();
    };
    let verifier = match WebhookVerifier::new(secret) {
        Ok(v) => v,
        Err(err) => {
            error!(?err, "webhook secret rejected");
            return JsonResponse::server_error("DODO_WEBHOOK_SECRET not configured")
                .into_response();
        }
    };

    let id = header_str(&headers, "webhook-id");
    let timestamp = header_str(&headers, "webhook-timestamp");
    let signature = header_str(&headers, "webhook-signature");
    if let Err(err) = verifier.verify(&body, id, timestamp, signature) {
        warn!(?err, "webhook signature verification failed");
        return JsonResponse::bad_request("Invalid signature").into_response();
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return JsonResponse::bad_request("Invalid JSON payload").into_response(),
    };
    let event = PaymentEvent::from_payload(&payload);

    // Claim before granting: of N concurrent deliveries of one id exactly
    // one wins the insert, so a duplicate can never double-grant. An
    // event without an id skips dedup entirely.
    if !event.id.is_empty() {
        match app_state.event_log.claim_event(&event.id).await {
            Ok(true) => {}
            Ok(false) => {
                info!(event_id = %event.id, "duplicate webhook delivery acknowledged");
                return Json(json!({ "ok": true, "duplicate": true })).into_response();
            }
            Err(err) => {
                // Nothing granted yet; let the provider redeliver.
                error!(?err, event_id = %event.id, "failed to record webhook event");
                return JsonResponse::server_error("Event log unavailable").into_response();
            }
        }
    }

    let mut granted: i64 = 0;
    if event.kind.grants_credits() {
        match event.customer_email() {
            Some(email) => {
                let amount = event.resolve_credits();
                if amount > 0 {
                    match app_state.credits.add_credits(&email, amount).await {
                        Ok(balance) => {
                            granted = amount;
                            info!(
                                event_id = %event.id,
                                event_type = %event.kind.as_str(),
                                %email,
                                granted,
                                balance,
                                "credits granted"
                            );
                        }
                        Err(err) => {
                            // The claim already happened, so the provider
                            // will not retry this event; surface loudly.
                            error!(
                                ?err,
                                event_id = %event.id,
                                %email,
                                amount,
                                "credit grant failed after event was claimed"
                            );
                        }
                    }
                } else {
                    warn!(
                        event_id = %event.id,
                        plan = %event.plan_name(),
                        "payment event did not resolve to a credit grant"
                    );
                }
            }
            None => {
                info!(
                    event_id = %event.id,
                    event_type = %event.kind.as_str(),
                    "payment event without a customer email skipped"
                );
            }
        }
    } else {
        info!(event_type = %event.kind.as_str(), "unhandled payment event acknowledged");
    }

    Json(json!({ "ok": true, "granted": granted })).into_response()
}
