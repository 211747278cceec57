use async_trait::async_trait;

/// Keyed credit balances, addressed by account email.
///
/// Keys are normalized (trimmed, lowercased) by every implementation, so
/// lookups are case-insensitive. A key that has never been granted reads
/// as 0; balances never go below 0.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Increments the balance and returns the new value. The increment is
    /// atomic per key. A negative amount clamps the result at 0.
    async fn add_credits(&self, email: &str, amount: i64) -> Result<i64, sqlx::Error>;

    /// Overwrites the balance (floored at 0).
    async fn set_credits(&self, email: &str, amount: i64) -> Result<(), sqlx::Error>;

    async fn get_credits(&self, email: &str) -> Result<i64, sqlx::Error>;
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
