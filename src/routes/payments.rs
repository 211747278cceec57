use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::responses::JsonResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct CheckoutLinkParams {
    pub quantity: Option<u64>,
    pub redirect_url: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
    #[serde(rename = "disableEmail")]
    pub disable_email: Option<String>,
    #[serde(rename = "disableFirstName")]
    pub disable_first_name: Option<String>,
    #[serde(rename = "disableLastName")]
    pub disable_last_name: Option<String>,
    #[serde(rename = "showDiscounts")]
    pub show_discounts: Option<String>,
}

// GET /api/payments/pro/link
pub async fn pro_checkout_link(
    State(app_state): State<AppState>,
    Query(params): Query<CheckoutLinkParams>,
) -> Response {
    let Some(product_id) = app_state.config.pro_product_id.as_deref() else {
        return JsonResponse::server_error("DODO_PRO_PRODUCT_ID not configured").into_response();
    };

    let redirect_url = params
        .redirect_url
        .filter(|v| !v.is_empty())
        .or_else(|| app_state.config.return_url.clone());
    let Some(redirect_url) = redirect_url else {
        return JsonResponse::server_error("redirect_url is required but not provided")
            .into_response();
    };

    let pairs = [
        ("quantity", params.quantity.unwrap_or(1).to_string()),
        ("redirect_url", redirect_url),
        ("email", params.email.unwrap_or_default()),
        ("firstName", params.first_name.unwrap_or_default()),
        ("lastName", params.last_name.unwrap_or_default()),
        ("disableEmail", params.disable_email.unwrap_or_default()),
        (
            "disableFirstName",
            params.disable_first_name.unwrap_or_default(),
        ),
        (
            "disableLastName",
            params.disable_last_name.unwrap_or_default(),
        ),
        ("showDiscounts", params.show_discounts.unwrap_or_default()),
    ];

    let link = build_static_checkout_link(&app_state.config.checkout_base, product_id, &pairs);
    Json(json!({ "paymentLink": link })).into_response()
}

/// Static checkout URL: `{base}/{product_id}?{query}`, with empty
/// parameters left out.
fn build_static_checkout_link(base: &str, product_id: &str, params: &[(&str, String)]) -> String {
    let base = base.trim_end_matches('/');
    let query = params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    if query.is_empty() {
        format!("{}/{}", base, product_id.trim())
    } else {
        format!("{}/{}?{}", base, product_id.trim(), query)
    }
}
