//! Skill memory: which element a target phrase resolved to on a given site.

use super::cache::{CacheEntry, CacheError, EntryCache, RetentionPolicy};
use super::now_ms;
use super::scope::Scope;
use super::store::KeyValueStore;
use crate::config::MemoryConfig;
use crate::resolution::Resolver;
use cortex_common::dom::{DomSnapshot, NodeId};
use cortex_common::protocol::{ElementHints, Intent};
use cortex_common::text::normalize_text;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const SKILL_STORAGE_KEY: &str = "cortex.skill_memory";

const HOST_WEIGHT: u32 = 5;
const PATH_WEIGHT: u32 = 2;
const EXACT_TARGET_WEIGHT: u32 = 8;
const SHARED_TOKEN_WEIGHT: u32 = 1;
const MAX_SUCCESS_BONUS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillMemoryEntry {
    pub key: String,
    pub host: String,
    pub path_prefix: String,
    pub intent: Intent,
    /// Normalized target phrase.
    pub target: String,
    pub hints: ElementHints,
    pub success_count: u32,
    pub created_at: u64,
    pub updated_at: u64,
    pub last_used: u64,
}

impl CacheEntry for SkillMemoryEntry {
    const KEY_SEGMENTS: usize = 4;

    fn key(&self) -> &str {
        &self.key
    }

    fn last_used(&self) -> u64 {
        self.last_used
    }
}

pub fn skill_key(scope: &Scope, intent: Intent, target: &str) -> String {
    format!(
        "{}|{}|{}|{}",
        scope.host,
        scope.path_prefix,
        intent.as_str(),
        normalize_text(target)
    )
}

/// Relevance of `entry` to a lookup. Entries for other intents score zero.
pub fn score_entry(entry: &SkillMemoryEntry, scope: &Scope, intent: Intent, target: &str) -> u32 {
    if entry.intent != intent {
        return 0;
    }
    let target = normalize_text(target);
    let mut score = 0;

    if entry.host == scope.host {
        score += HOST_WEIGHT;
    }
    if entry.path_prefix == scope.path_prefix {
        score += PATH_WEIGHT;
    }
    if entry.target == target {
        score += EXACT_TARGET_WEIGHT;
    }
    let entry_tokens: Vec<&str> = entry.target.split(' ').filter(|t| !t.is_empty()).collect();
    let mut seen = Vec::new();
    for token in target.split(' ').filter(|t| !t.is_empty()) {
        if entry_tokens.contains(&token) && !seen.contains(&token) {
            seen.push(token);
            score += SHARED_TOKEN_WEIGHT;
        }
    }
    score + entry.success_count.min(MAX_SUCCESS_BONUS)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkillMatch {
    pub entry: SkillMemoryEntry,
    pub element: NodeId,
    pub score: u32,
}

pub struct SkillMemory {
    cache: EntryCache<SkillMemoryEntry>,
    resolver: Resolver,
    min_score: u32,
}

impl SkillMemory {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &MemoryConfig, resolver: Resolver) -> Self {
        Self {
            cache: EntryCache::new(
                store,
                SKILL_STORAGE_KEY,
                RetentionPolicy::days(config.skill_max_entries, config.skill_ttl_days),
            ),
            resolver,
            min_score: config.min_match_score,
        }
    }

    pub async fn entries(&self) -> Vec<SkillMemoryEntry> {
        self.cache.entries().await
    }

    /// Best remembered element for `target` that still exists on the page.
    ///
    /// Candidates are tried highest score first; the first whose hints re-resolve to a
    /// live element wins.
    pub async fn find(
        &self,
        scope: &Scope,
        intent: Intent,
        target: &str,
        snapshot: &DomSnapshot,
    ) -> Option<SkillMatch> {
        let mut ranked: Vec<(u32, SkillMemoryEntry)> = self
            .cache
            .entries()
            .await
            .into_iter()
            .map(|e| (score_entry(&e, scope, intent, target), e))
            .filter(|(s, _)| *s >= self.min_score)
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0));

        for (score, entry) in ranked {
            if let Some(element) = self.resolver.resolve(&entry.hints, intent, snapshot) {
                tracing::debug!(key = %entry.key, score, element, "skill memory hit");
                return Some(SkillMatch {
                    entry,
                    element,
                    score,
                });
            }
        }
        None
    }

    /// Record that `target` resolved to an element described by `hints`.
    pub async fn learn(
        &self,
        scope: &Scope,
        intent: Intent,
        target: &str,
        hints: ElementHints,
    ) -> Result<(), CacheError> {
        let key = skill_key(scope, intent, target);
        let now = now_ms();
        let normalized = normalize_text(target);
        let scope = scope.clone();

        self.cache
            .update(move |entries| {
                if let Some(existing) = entries.iter_mut().find(|e| e.key == key) {
                    existing.hints.merge(&hints);
                    existing.success_count = existing.success_count.saturating_add(1);
                    existing.updated_at = now;
                    existing.last_used = now;
                } else {
                    entries.push(SkillMemoryEntry {
                        key,
                        host: scope.host,
                        path_prefix: scope.path_prefix,
                        intent,
                        target: normalized,
                        hints,
                        success_count: 1,
                        created_at: now,
                        updated_at: now,
                        last_used: now,
                    });
                }
            })
            .await
    }
}
