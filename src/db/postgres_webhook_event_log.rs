use async_trait::async_trait;
use sqlx::{PgPool, Postgres};

use crate::db::webhook_event_log::WebhookEventLog;

/// Durable event log. Expects:
///
/// ```sql
/// CREATE TABLE webhook_event_log (
///     event_id    TEXT PRIMARY KEY,
///     received_at TIMESTAMPTZ NOT NULL DEFAULT now()
/// );
/// ```
pub struct PostgresWebhookEventLog {
    pub pool: PgPool,
}

#[async_trait]
impl WebhookEventLog for PostgresWebhookEventLog {
    async fn claim_event(&self, event_id: &str) -> Result<bool, sqlx::Error> {
        // The primary key arbitrates concurrent deliveries: only the
        // insert that lands first reports a row written.
        let result = sqlx::query::<Postgres>(
            r#"
            INSERT INTO webhook_event_log (event_id)
            VALUES ($1)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn has_processed_event(&self, event_id: &str) -> Result<bool, sqlx::Error> {
        let exists = sqlx::query_scalar::<Postgres, i64>(
            "SELECT 1 FROM webhook_event_log WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?
        .is_some();

        Ok(exists)
    }
}
