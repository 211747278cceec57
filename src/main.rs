use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::response::IntoResponse;
use axum::{
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use contractai_backend::config::Config;
use contractai_backend::db::credit_ledger::CreditLedger;
use contractai_backend::db::memory_credit_ledger::MemoryCreditLedger;
use contractai_backend::db::memory_webhook_event_log::MemoryWebhookEventLog;
use contractai_backend::db::postgres_credit_ledger::PostgresCreditLedger;
use contractai_backend::db::postgres_webhook_event_log::PostgresWebhookEventLog;
use contractai_backend::db::webhook_event_log::WebhookEventLog;
use contractai_backend::responses::JsonResponse;
use contractai_backend::routes::{
    analysis::{analyze, ask_question, generate_email},
    contracts::{delete_contract, list_contracts, upload_contract},
    credits::get_credits,
    health::{health_check, root},
    payments::pro_checkout_link,
    webhooks::dodo_webhook,
};
use contractai_backend::services::ai::{ContractAi, GeminiContractAi};
use contractai_backend::state::AppState;

const UPLOAD_BODY_LIMIT: usize = 25 * 1024 * 1024;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).unwrap();

    let rate_limit_ms: u64 = std::env::var("RATE_LIMITER_MILLISECONDS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        // Default: 200ms/token (~5 req/sec)
        .unwrap_or(200);
    let rate_limit_burst: u32 = std::env::var("RATE_LIMITER_BURST")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        // Default: allow short bursts during client polling
        .unwrap_or(20);
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(rate_limit_ms)
            .burst_size(rate_limit_burst)
            .use_headers()
            .error_handler(|_err| {
                JsonResponse::too_many_requests(
                    "Too many requests. Please wait a moment and try again.",
                )
                .into_response()
            })
            .finish()
            .unwrap(),
    );

    // Background task to cleanup old IPs
    let governor_limiter = governor_conf.limiter().clone();
    std::thread::spawn(move || {
        let interval = std::time::Duration::from_secs(60);
        loop {
            std::thread::sleep(interval);
            governor_limiter.retain_recent();
        }
    });

    let config = Arc::new(Config::from_env());

    let (credits, event_log): (Arc<dyn CreditLedger>, Arc<dyn WebhookEventLog>) =
        match config.database_url.as_deref() {
            Some(url) => {
                let pool = establish_connection(url).await;
                (
                    Arc::new(PostgresCreditLedger { pool: pool.clone() }),
                    Arc::new(PostgresWebhookEventLog { pool }),
                )
            }
            None => {
                warn!(
                    "DATABASE_URL not set; credit balances and webhook dedup history \
                     are process-local and lost on restart"
                );
                (
                    Arc::new(MemoryCreditLedger::new()),
                    Arc::new(MemoryWebhookEventLog::new()),
                )
            }
        };

    let http_client = reqwest::Client::new();
    let ai: Option<Arc<dyn ContractAi>> = config.gemini_api_key.as_deref().map(|key| {
        Arc::new(GeminiContractAi::new(
            http_client.clone(),
            key,
            config.gemini_model.clone(),
        )) as Arc<dyn ContractAi>
    });
    if ai.is_none() {
        warn!("GEMINI_API_KEY not set; analysis endpoints will fail fast");
    }

    let state = AppState {
        credits,
        event_log,
        ai,
        config: config.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(config.frontend_origin.parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/upload", post(upload_contract))
        .route("/api/contracts", get(list_contracts))
        .route("/api/contracts/{filename}", delete(delete_contract))
        .route("/api/analyze", post(analyze))
        .route("/api/ask-question", post(ask_question))
        .route("/api/generate-email", post(generate_email))
        .route("/api/credits/{email}", get(get_credits))
        .route("/api/payments/pro/link", get(pro_checkout_link))
        .route("/api/webhooks/dodo", post(dodo_webhook))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer {
            config: governor_conf,
        })
        .layer(cors);

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(8000);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    let listener = TcpListener::bind(addr).await.unwrap();
    info!("Contract AI backend listening at http://{}", addr);
    axum::serve(listener, make_service).await.unwrap();
}

/// Establish a connection to the database and verify it.
async fn establish_connection(database_url: &str) -> PgPool {
    let pool = PgPool::connect(database_url)
        .await
        .expect("Failed to connect to the database");

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .expect("Failed to verify database connection");

    info!("Successfully connected to the database");
    pool
}
