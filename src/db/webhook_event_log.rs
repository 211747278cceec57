use async_trait::async_trait;

/// Append-only record of webhook event ids that have been handled.
///
/// `claim_event` is the idempotency gate: an atomic first-writer-wins
/// insert. Of N concurrent deliveries of one event id, exactly one call
/// returns `true`, and only that caller may go on to grant credits.
/// Claims last for the lifetime of the store.
#[async_trait]
pub trait WebhookEventLog: Send + Sync {
    /// Returns `true` when this call recorded the id for the first time.
    async fn claim_event(&self, event_id: &str) -> Result<bool, sqlx::Error>;

    async fn has_processed_event(&self, event_id: &str) -> Result<bool, sqlx::Error>;
}
