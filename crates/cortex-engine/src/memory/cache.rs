use super::now_ms;
use super::store::KeyValueStore;
use cortex_common::error::StoreError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// An entry of a pruned, persisted memory list.
pub trait CacheEntry: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Number of `|`-separated segments in a well-formed key. The first is the host.
    const KEY_SEGMENTS: usize;

    fn key(&self) -> &str;

    /// Milliseconds since the epoch.
    fn last_used(&self) -> u64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_entries: usize,
    pub ttl_ms: u64,
}

impl RetentionPolicy {
    pub fn days(max_entries: usize, ttl_days: u64) -> Self {
        Self {
            max_entries,
            ttl_ms: ttl_days.saturating_mul(super::DAY_MS),
        }
    }
}

pub fn well_formed_key(key: &str, segments: usize) -> bool {
    let parts: Vec<&str> = key.split('|').collect();
    parts.len() == segments && !parts[0].is_empty()
}

/// Drop malformed and expired entries, keep the most recent entry per key, order by
/// recency and cap the list. Idempotent for a fixed `now`.
pub fn prune<E: CacheEntry>(entries: Vec<E>, now: u64, policy: RetentionPolicy) -> Vec<E> {
    let mut live: Vec<E> = entries
        .into_iter()
        .filter(|e| well_formed_key(e.key(), E::KEY_SEGMENTS))
        .filter(|e| now.saturating_sub(e.last_used()) <= policy.ttl_ms)
        .collect();

    live.sort_by(|a, b| b.last_used().cmp(&a.last_used()));

    let mut seen = HashSet::new();
    live.retain(|e| seen.insert(e.key().to_string()));
    live.truncate(policy.max_entries);
    live
}

/// A memory list loaded lazily from a store under one key.
///
/// The first caller triggers the load; concurrent callers wait on the same read. A
/// failed load degrades to an empty list. Writes go straight back to the store without
/// cross-writer locking, so two concurrent writers may lose an update.
pub struct EntryCache<E> {
    store: Arc<dyn KeyValueStore>,
    storage_key: &'static str,
    policy: RetentionPolicy,
    loaded: OnceCell<()>,
    entries: Mutex<Vec<E>>,
}

impl<E: CacheEntry> EntryCache<E> {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        storage_key: &'static str,
        policy: RetentionPolicy,
    ) -> Self {
        Self {
            store,
            storage_key,
            policy,
            loaded: OnceCell::new(),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn storage_key(&self) -> &'static str {
        self.storage_key
    }

    async fn ensure_loaded(&self) {
        self.loaded
            .get_or_init(|| async {
                let loaded = match self.read().await {
                    Ok(entries) => entries,
                    Err(e) => {
                        tracing::warn!(
                            key = self.storage_key,
                            error = %e,
                            "memory load failed, starting empty"
                        );
                        Vec::new()
                    }
                };
                *self.entries.lock().await = loaded;
            })
            .await;
    }

    async fn read(&self) -> Result<Vec<E>, CacheError> {
        let Some(value) = self.store.get(self.storage_key).await? else {
            return Ok(Vec::new());
        };
        let raw: Vec<Value> = serde_json::from_value(value)?;
        let total = raw.len();
        let entries: Vec<E> = raw
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect();
        if entries.len() < total {
            tracing::debug!(
                key = self.storage_key,
                dropped = total - entries.len(),
                "skipped malformed memory entries"
            );
        }
        Ok(entries)
    }

    /// Current entries, pruned.
    pub async fn entries(&self) -> Vec<E> {
        self.ensure_loaded().await;
        let mut guard = self.entries.lock().await;
        let pruned = prune(std::mem::take(&mut *guard), now_ms(), self.policy);
        *guard = pruned.clone();
        pruned
    }

    /// Apply `f`, prune, and persist.
    pub async fn update<F>(&self, f: F) -> Result<(), CacheError>
    where
        F: FnOnce(&mut Vec<E>) + Send,
    {
        self.ensure_loaded().await;
        let value = {
            let mut guard = self.entries.lock().await;
            f(&mut guard);
            let pruned = prune(std::mem::take(&mut *guard), now_ms(), self.policy);
            *guard = pruned;
            serde_json::to_value(&*guard)?
        };
        self.store.set(self.storage_key, value).await?;
        Ok(())
    }
}
