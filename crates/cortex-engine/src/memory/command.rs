//! Command memory: canonical rewrites of commands that only parsed after repair.

use super::cache::{CacheEntry, CacheError, EntryCache, RetentionPolicy};
use super::now_ms;
use super::scope::Scope;
use super::store::KeyValueStore;
use crate::config::MemoryConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const COMMAND_STORAGE_KEY: &str = "cortex.command_memory";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NaturalCommandMemoryEntry {
    pub key: String,
    pub host: String,
    pub path_prefix: String,
    /// Normalized command as the user typed it.
    pub command: String,
    pub canonical_command: String,
    pub success_count: u32,
    pub repaired_count: u32,
    pub last_used: u64,
}

impl CacheEntry for NaturalCommandMemoryEntry {
    const KEY_SEGMENTS: usize = 3;

    fn key(&self) -> &str {
        &self.key
    }

    fn last_used(&self) -> u64 {
        self.last_used
    }
}

fn normalized_command(command: &str) -> String {
    cortex_parser::command_key(command).replace('|', " ")
}

pub fn command_key(scope: &Scope, command: &str) -> String {
    format!(
        "{}|{}|{}",
        scope.host,
        scope.path_prefix,
        normalized_command(command)
    )
}

pub struct CommandMemory {
    cache: EntryCache<NaturalCommandMemoryEntry>,
}

impl CommandMemory {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &MemoryConfig) -> Self {
        Self {
            cache: EntryCache::new(
                store,
                COMMAND_STORAGE_KEY,
                RetentionPolicy::days(config.command_max_entries, config.command_ttl_days),
            ),
        }
    }

    pub async fn entries(&self) -> Vec<NaturalCommandMemoryEntry> {
        self.cache.entries().await
    }

    /// Canonical form previously learned for `command` in this scope.
    pub async fn lookup(&self, scope: &Scope, command: &str) -> Option<String> {
        let key = command_key(scope, command);
        self.cache
            .entries()
            .await
            .into_iter()
            .find(|e| e.key == key)
            .map(|e| e.canonical_command)
    }

    pub async fn learn(
        &self,
        scope: &Scope,
        command: &str,
        canonical: &str,
        repaired: bool,
    ) -> Result<(), CacheError> {
        let key = command_key(scope, command);
        let now = now_ms();
        let normalized = normalized_command(command);
        let canonical = canonical.to_string();
        let scope = scope.clone();
        let repaired_inc = u32::from(repaired);

        self.cache
            .update(move |entries| {
                if let Some(existing) = entries.iter_mut().find(|e| e.key == key) {
                    existing.canonical_command = canonical;
                    existing.success_count = existing.success_count.saturating_add(1);
                    existing.repaired_count = existing.repaired_count.saturating_add(repaired_inc);
                    existing.last_used = now;
                } else {
                    entries.push(NaturalCommandMemoryEntry {
                        key,
                        host: scope.host,
                        path_prefix: scope.path_prefix,
                        command: normalized,
                        canonical_command: canonical,
                        success_count: 1,
                        repaired_count: repaired_inc,
                        last_used: now,
                    });
                }
            })
            .await
    }
}
