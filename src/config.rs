use std::env;
use std::path::PathBuf;

pub const DEFAULT_CHECKOUT_BASE: &str = "https://checkout.dodopayments.com/buy";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Runtime configuration, read once at startup.
///
/// Feature-gating variables stay `Option` here; the owning endpoint fails
/// fast with a configuration error when the variable it needs is unset.
pub struct Config {
    pub frontend_origin: String,
    pub database_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub checkout_base: String,
    pub pro_product_id: Option<String>,
    pub return_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub upload_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok(); // Load .env file

        let frontend_origin =
            env::var("FRONTEND_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Config {
            frontend_origin,
            database_url: non_empty(env::var("DATABASE_URL").ok()),
            webhook_secret: non_empty(env::var("DODO_WEBHOOK_SECRET").ok()),
            checkout_base: env::var("DODO_CHECKOUT_BASE")
                .unwrap_or_else(|_| DEFAULT_CHECKOUT_BASE.to_string()),
            pro_product_id: non_empty(env::var("DODO_PRO_PRODUCT_ID").ok()),
            return_url: non_empty(env::var("DODO_RETURN_URL").ok()),
            gemini_api_key: non_empty(env::var("GEMINI_API_KEY").ok()),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            upload_dir: PathBuf::from(env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into())),
        }
    }
}

fn non_empty(var: Option<String>) -> Option<String> {
    var.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_filters_blank_values() {
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(Some("   ".into())), None);
        assert_eq!(non_empty(Some("whsec_x".into())), Some("whsec_x".into()));
    }
}
