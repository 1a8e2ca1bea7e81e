use crate::domain_model::{RefreshToken, Subject};
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use crate::logger::*;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

const REVOKED_MARKER: &str = "revoked";

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expire_at: DateTime<Utc>,
}

/// Revocation store for single-process deployments and tests. Entries expire
/// lazily against the injected clock.
pub struct MemoryRevocationStore {
    entries: DashMap<StoreKey, Entry>,
    clock: Arc<dyn Clock>,
}

impl MemoryRevocationStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        MemoryRevocationStore {
            entries: DashMap::new(),
            clock,
        }
    }

    fn put(&self, key: StoreKey, value: String, ttl_secs: u64) {
        let ttl = chrono::Duration::seconds(ttl_secs.min(i64::MAX as u64) as i64);
        let expire_at = self.clock.now() + ttl;
        self.entries.insert(key, Entry { value, expire_at });
    }

    fn live_value(&self, key: &StoreKey) -> Option<String> {
        let now = self.clock.now();
        let value = self.entries.get(key).map(|e| (e.value.clone(), e.expire_at))?;
        if value.1 <= now {
            self.entries.remove_if(key, |_, e| e.expire_at <= now);
            return None;
        }
        Some(value.0)
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expire_at > now);
        before.saturating_sub(self.entries.len())
    }

    /// Purge on a fixed period until the store is dropped.
    pub fn spawn_purge(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let purged = store.purge_expired();
                if purged > 0 {
                    debug!(purged, remaining = store.len(), "purged expired revocation records");
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait::async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn mark_revoked(&self, key: &StoreKey, ttl_secs: u64) -> Result<(), StoreError> {
        self.put(key.clone(), REVOKED_MARKER.to_string(), ttl_secs);
        Ok(())
    }

    async fn is_revoked(&self, key: &StoreKey) -> Result<bool, StoreError> {
        Ok(self.live_value(key).is_some())
    }

    async fn set_current_refresh(
        &self,
        subject: &Subject,
        token: &RefreshToken,
        ttl_secs: u64,
    ) -> Result<(), StoreError> {
        self.put(
            StoreKey::current_refresh(subject),
            token.as_str().to_string(),
            ttl_secs,
        );
        Ok(())
    }

    async fn get_current_refresh(
        &self,
        subject: &Subject,
    ) -> Result<Option<RefreshToken>, StoreError> {
        Ok(self
            .live_value(&StoreKey::current_refresh(subject))
            .map(RefreshToken))
    }

    async fn delete(&self, key: &StoreKey) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}
