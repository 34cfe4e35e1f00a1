//! Learned memories that bias later commands toward what worked before.
//!
//! Both memories are scoped by host and leading path, stored as JSON arrays in a
//! `KeyValueStore`, and pruned (TTL, dedupe, cap) on every read and write.

pub mod cache;
pub mod command;
pub mod scope;
pub mod skill;
pub mod store;

pub use cache::{CacheEntry, CacheError, EntryCache, RetentionPolicy, prune};
pub use command::{CommandMemory, NaturalCommandMemoryEntry};
pub use scope::Scope;
pub use skill::{SkillMatch, SkillMemory, SkillMemoryEntry};
pub use store::{FileStore, InMemoryStore, KeyValueStore};

use std::time::{SystemTime, UNIX_EPOCH};

pub const DAY_MS: u64 = 24 * 60 * 60 * 1000;

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
