//! Client-side entitlement mirror.
//!
//! A keyed local cache of plan + credit balance (plus recent analysis
//! timestamps), the way the web client keeps them in browser storage.
//! This is a display/gating convenience only: billing reads and writes go
//! through the server-side ledger, and `refresh` overwrites this mirror
//! from those authoritative values.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use time::OffsetDateTime;

use crate::models::plan::Plan;

const KEY_NAMESPACE: &str = "contractai";
const RECENT_ANALYSES_CAP: usize = 20;

/// Balance a user starts with before any purchase has synced.
pub const DEFAULT_FREE_CREDITS: i64 = 10;

/// Storage the cache persists into; the browser build backs this with
/// localStorage, tests and native callers with the in-memory store.
pub trait EntitlementStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

#[derive(Default)]
pub struct MemoryEntitlementStore {
    values: DashMap<String, String>,
}

impl MemoryEntitlementStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntitlementStore for MemoryEntitlementStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).map(|v| v.clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

type ChangeListener = Box<dyn Fn(&str) + Send + Sync>;

pub struct EntitlementCache {
    store: Arc<dyn EntitlementStore>,
    // Best-effort stand-in for the cross-tab storage-change event.
    listeners: Mutex<Vec<ChangeListener>>,
}

impl EntitlementCache {
    pub fn new(store: Arc<dyn EntitlementStore>) -> Self {
        Self {
            store,
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn key(user_id: &str, name: &str) -> String {
        format!("{}:{}:{}", KEY_NAMESPACE, name, user_id)
    }

    pub fn plan(&self, user_id: &str) -> Plan {
        self.store
            .get(&Self::key(user_id, "plan"))
            .map(|v| Plan::parse(&v))
            .unwrap_or(Plan::Free)
    }

    pub fn set_plan(&self, user_id: &str, plan: Plan) {
        self.set_value(&Self::key(user_id, "plan"), plan.as_str());
    }

    pub fn credits(&self, user_id: &str) -> i64 {
        match self.store.get(&Self::key(user_id, "credits")) {
            None => DEFAULT_FREE_CREDITS,
            Some(raw) => raw.parse::<i64>().unwrap_or(0).max(0),
        }
    }

    pub fn set_credits(&self, user_id: &str, credits: i64) {
        self.set_value(&Self::key(user_id, "credits"), &credits.max(0).to_string());
    }

    /// Consumption policy: one credit per completed analysis. A pro plan
    /// is unlimited and never decrements.
    pub fn consume_credit(&self, user_id: &str) {
        if self.plan(user_id) == Plan::Pro {
            return;
        }
        let left = self.credits(user_id);
        if left > 0 {
            self.set_credits(user_id, left - 1);
        }
    }

    /// Remembers a completed analysis and consumes its credit.
    pub fn record_analysis(&self, user_id: &str, at: OffsetDateTime) {
        let key = Self::key(user_id, "recent");
        let mut recent = self.recent_analyses(user_id);
        recent.push(at.unix_timestamp());
        if recent.len() > RECENT_ANALYSES_CAP {
            let drop = recent.len() - RECENT_ANALYSES_CAP;
            recent.drain(..drop);
        }
        let encoded = serde_json::to_string(&recent).unwrap_or_else(|_| "[]".to_string());
        self.set_value(&key, &encoded);
        self.consume_credit(user_id);
    }

    pub fn recent_analyses(&self, user_id: &str) -> Vec<i64> {
        self.store
            .get(&Self::key(user_id, "recent"))
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    /// Overwrites the mirror from server-authoritative values.
    pub fn refresh(&self, user_id: &str, plan: Plan, credits: i64) {
        self.set_plan(user_id, plan);
        self.set_credits(user_id, credits);
    }

    pub fn on_change(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        self.listeners.lock().unwrap().push(Box::new(listener));
    }

    fn set_value(&self, key: &str, value: &str) {
        self.store.set(key, value);
        for listener in self.listeners.lock().unwrap().iter() {
            listener(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache() -> EntitlementCache {
        EntitlementCache::new(Arc::new(MemoryEntitlementStore::new()))
    }

    #[test]
    fn defaults_are_free_plan_with_starter_credits() {
        let cache = cache();
        assert_eq!(cache.plan("user-1"), Plan::Free);
        assert_eq!(cache.credits("user-1"), DEFAULT_FREE_CREDITS);
    }

    #[test]
    fn consume_decrements_and_floors_at_zero() {
        let cache = cache();
        cache.set_credits("user-1", 2);
        cache.consume_credit("user-1");
        cache.consume_credit("user-1");
        cache.consume_credit("user-1");
        assert_eq!(cache.credits("user-1"), 0);
    }

    #[test]
    fn pro_plan_never_decrements() {
        let cache = cache();
        cache.set_plan("user-1", Plan::Pro);
        cache.set_credits("user-1", 3);
        for _ in 0..5 {
            cache.consume_credit("user-1");
        }
        assert_eq!(cache.credits("user-1"), 3);
    }

    #[test]
    fn users_are_isolated() {
        let cache = cache();
        cache.set_credits("user-1", 1);
        cache.set_plan("user-2", Plan::Pro);
        assert_eq!(cache.credits("user-2"), DEFAULT_FREE_CREDITS);
        assert_eq!(cache.plan("user-1"), Plan::Free);
    }

    #[test]
    fn corrupt_credit_values_read_as_zero() {
        let store = Arc::new(MemoryEntitlementStore::new());
        store.set("contractai:credits:user-1", "garbage");
        let cache = EntitlementCache::new(store);
        assert_eq!(cache.credits("user-1"), 0);
    }

    #[test]
    fn record_analysis_tracks_timestamps_and_consumes() {
        let cache = cache();
        let t0 = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let t1 = OffsetDateTime::from_unix_timestamp(1_700_000_060).unwrap();
        cache.record_analysis("user-1", t0);
        cache.record_analysis("user-1", t1);

        assert_eq!(
            cache.recent_analyses("user-1"),
            vec![1_700_000_000, 1_700_000_060]
        );
        assert_eq!(cache.credits("user-1"), DEFAULT_FREE_CREDITS - 2);
    }

    #[test]
    fn recent_analyses_keep_only_the_latest() {
        let cache = cache();
        for i in 0..(RECENT_ANALYSES_CAP as i64 + 5) {
            let at = OffsetDateTime::from_unix_timestamp(1_700_000_000 + i).unwrap();
            cache.record_analysis("user-1", at);
        }
        let recent = cache.recent_analyses("user-1");
        assert_eq!(recent.len(), RECENT_ANALYSES_CAP);
        assert_eq!(recent[0], 1_700_000_005);
    }

    #[test]
    fn refresh_overwrites_from_authoritative_values() {
        let cache = cache();
        cache.set_credits("user-1", 1);
        cache.refresh("user-1", Plan::Pro, 10);
        assert_eq!(cache.plan("user-1"), Plan::Pro);
        assert_eq!(cache.credits("user-1"), 10);
    }

    #[test]
    fn change_listeners_see_written_keys() {
        let cache = cache();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        cache.on_change(move |key| {
            assert!(key.starts_with("contractai:"));
            counter.fetch_add(1, Ordering::SeqCst);
        });
        cache.set_plan("user-1", Plan::Pro);
        cache.set_credits("user-1", 4);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
