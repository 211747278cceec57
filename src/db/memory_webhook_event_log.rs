use async_trait::async_trait;
use dashmap::DashMap;

use crate::db::webhook_event_log::WebhookEventLog;

/// Process-local event log. Dedup history is lost on restart; see the
/// Postgres log for durable deployments.
#[derive(Default)]
pub struct MemoryWebhookEventLog {
    events: DashMap<String, ()>,
}

impl MemoryWebhookEventLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebhookEventLog for MemoryWebhookEventLog {
    async fn claim_event(&self, event_id: &str) -> Result<bool, sqlx::Error> {
        // insert() returns the previous value, so None means this call won.
        Ok(self.events.insert(event_id.to_string(), ()).is_none())
    }

    async fn has_processed_event(&self, event_id: &str) -> Result<bool, sqlx::Error> {
        Ok(self.events.contains_key(event_id))
    }
}
