use crate::config::Config;
use crate::db::{credit_ledger::CreditLedger, webhook_event_log::WebhookEventLog};
use crate::services::ai::ContractAi;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub credits: Arc<dyn CreditLedger>,
    pub event_log: Arc<dyn WebhookEventLog>,
    /// Absent when GEMINI_API_KEY is unset; the analysis endpoints then
    /// fail fast with a configuration error.
    pub ai: Option<Arc<dyn ContractAi>>,
    pub config: Arc<Config>,
}
