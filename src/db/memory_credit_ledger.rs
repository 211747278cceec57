use async_trait::async_trait;
use dashmap::DashMap;

use crate::db::credit_ledger::{normalize_email, CreditLedger};

/// Process-local ledger. Balances live only for the lifetime of the
/// process; use the Postgres ledger for anything beyond a singleton
/// deployment.
#[derive(Default)]
pub struct MemoryCreditLedger {
    balances: DashMap<String, i64>,
}

impl MemoryCreditLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CreditLedger for MemoryCreditLedger {
    async fn add_credits(&self, email: &str, amount: i64) -> Result<i64, sqlx::Error> {
        let key = normalize_email(email);
        // entry() holds the shard lock for the read-modify-write, which
        // makes the increment atomic per key.
        let mut entry = self.balances.entry(key).or_insert(0);
        *entry = (*entry + amount).max(0);
        Ok(*entry)
    }

    async fn set_credits(&self, email: &str, amount: i64) -> Result<(), sqlx::Error> {
        self.balances.insert(normalize_email(email), amount.max(0));
        Ok(())
    }

    async fn get_credits(&self, email: &str) -> Result<i64, sqlx::Error> {
        Ok(self
            .balances
            .get(&normalize_email(email))
            .map(|v| *v)
            .unwrap_or(0))
    }
}
