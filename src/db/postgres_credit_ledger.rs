use async_trait::async_trait;
use sqlx::{PgPool, Postgres};

use crate::db::credit_ledger::{normalize_email, CreditLedger};

/// Durable ledger. Expects:
///
/// ```sql
/// CREATE TABLE credit_balances (
///     email   TEXT PRIMARY KEY,
///     credits BIGINT NOT NULL DEFAULT 0
/// );
/// ```
pub struct PostgresCreditLedger {
    pub pool: PgPool,
}

#[async_trait]
impl CreditLedger for PostgresCreditLedger {
    async fn add_credits(&self, email: &str, amount: i64) -> Result<i64, sqlx::Error> {
        let balance = sqlx::query_scalar::<Postgres, i64>(
            r#"
            INSERT INTO credit_balances (email, credits)
            VALUES ($1, GREATEST($2, 0))
            ON CONFLICT (email)
            DO UPDATE SET credits = GREATEST(credit_balances.credits + $2, 0)
            RETURNING credits
            "#,
        )
        .bind(normalize_email(email))
        .bind(amount)
        .fetch_one(&self.pool)
        .await?;

        Ok(balance)
    }

    async fn set_credits(&self, email: &str, amount: i64) -> Result<(), sqlx::Error> {
        sqlx::query::<Postgres>(
            r#"
            INSERT INTO credit_balances (email, credits)
            VALUES ($1, GREATEST($2, 0))
            ON CONFLICT (email)
            DO UPDATE SET credits = GREATEST(EXCLUDED.credits, 0)
            "#,
        )
        .bind(normalize_email(email))
        .bind(amount)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_credits(&self, email: &str) -> Result<i64, sqlx::Error> {
        let balance = sqlx::query_scalar::<Postgres, i64>(
            "SELECT credits FROM credit_balances WHERE email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        Ok(balance.unwrap_or(0))
    }
}
