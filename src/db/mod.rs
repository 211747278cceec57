pub mod credit_ledger;
pub mod memory_credit_ledger;
pub mod memory_webhook_event_log;
pub mod postgres_credit_ledger;
pub mod postgres_webhook_event_log;
pub mod webhook_event_log;
