use async_trait::async_trait;
use cortex_common::error::StoreError;
use cortex_engine::config::{MemoryConfig, ResolverConfig};
use cortex_engine::dom::DomSnapshot;
use cortex_engine::memory::skill::{SKILL_STORAGE_KEY, score_entry, skill_key};
use cortex_engine::memory::{
    CommandMemory, DAY_MS, FileStore, InMemoryStore, KeyValueStore, RetentionPolicy, Scope,
    SkillMemory, SkillMemoryEntry, now_ms, prune,
};
use cortex_engine::page::{MemoryPage, Page, PageFixture, el};
use cortex_engine::protocol::{ElementHints, Intent};
use cortex_engine::resolution::Resolver;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn skills(store: Arc<dyn KeyValueStore>) -> SkillMemory {
    SkillMemory::new(
        store,
        &MemoryConfig::default(),
        Resolver::new(&ResolverConfig::default()),
    )
}

fn named(name: &str) -> ElementHints {
    ElementHints {
        tag: Some("input".into()),
        name: Some(name.into()),
        ..Default::default()
    }
}

async fn contact_form() -> DomSnapshot {
    let page = MemoryPage::new(
        PageFixture::new("https://shop.example.com/checkout/details")
            .with(el(1, "input").attr("name", "billing_email"))
            .with(el(2, "input").attr("name", "contact_email")),
    );
    page.snapshot().await.unwrap()
}

fn scope() -> Scope {
    Scope::from_url("https://shop.example.com/checkout/details/step-2").unwrap()
}

fn entry(key: &str, last_used: u64) -> SkillMemoryEntry {
    SkillMemoryEntry {
        key: key.to_string(),
        host: "a.com".into(),
        path_prefix: "/".into(),
        intent: Intent::Click,
        target: "go".into(),
        hints: ElementHints::default(),
        success_count: 1,
        created_at: last_used,
        updated_at: last_used,
        last_used,
    }
}

#[tokio::test]
async fn test_learned_target_is_found_again() {
    let memory = skills(Arc::new(InMemoryStore::new()));
    let snapshot = contact_form().await;

    memory
        .learn(&scope(), Intent::Type, "Reply-To", named("contact_email"))
        .await
        .unwrap();

    let hit = memory
        .find(&scope(), Intent::Type, "reply to", &snapshot)
        .await
        .expect("remembered");
    assert_eq!(hit.element, 2);
    // host 5 + path 2 + exact 8 + shared tokens 2 + one success
    assert_eq!(hit.score, 18);
    assert_eq!(hit.entry.key, skill_key(&scope(), Intent::Type, "reply to"));

    // other intents never match
    assert!(
        memory
            .find(&scope(), Intent::Click, "reply to", &snapshot)
            .await
            .is_none()
    );
}

#[tokio::test]
async fn test_relearning_merges_hints_and_counts_successes() {
    let memory = skills(Arc::new(InMemoryStore::new()));

    memory
        .learn(&scope(), Intent::Type, "email", named("billing_email"))
        .await
        .unwrap();
    memory
        .learn(
            &scope(),
            Intent::Type,
            "Email",
            ElementHints {
                id: Some("email".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let entries = memory.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].success_count, 2);
    assert_eq!(entries[0].hints.name.as_deref(), Some("billing_email"));
    assert_eq!(entries[0].hints.id.as_deref(), Some("email"));
}

#[tokio::test]
async fn test_cross_site_entries_need_an_exact_target() {
    let memory = skills(Arc::new(InMemoryStore::new()));
    let snapshot = contact_form().await;
    let elsewhere = Scope::new("other.example.com", "/account");

    memory
        .learn(&elsewhere, Intent::Type, "contact", named("contact_email"))
        .await
        .unwrap();
    memory
        .learn(&elsewhere, Intent::Type, "newsletter", named("newsletter_opt_in"))
        .await
        .unwrap();

    // exact target on another site still clears the bar: 8 + 1 + 1
    let hit = memory
        .find(&scope(), Intent::Type, "contact", &snapshot)
        .await
        .expect("exact target match");
    assert_eq!(hit.score, 10);
    assert_eq!(hit.element, 2);

    // one shared token plus one success does not
    assert!(
        memory
            .find(&scope(), Intent::Type, "contact number", &snapshot)
            .await
            .is_none()
    );

    // an exact match whose element is not on this page is never returned
    assert!(
        memory
            .find(&scope(), Intent::Type, "newsletter", &snapshot)
            .await
            .is_none()
    );
}

#[tokio::test]
async fn test_unresolvable_entry_falls_back_to_next_ranked() {
    let memory = skills(Arc::new(InMemoryStore::new()));
    let snapshot = contact_form().await;

    memory
        .learn(&scope(), Intent::Type, "email", named("removed_field"))
        .await
        .unwrap();
    for _ in 0..3 {
        memory
            .learn(&scope(), Intent::Type, "email address", named("contact_email"))
            .await
            .unwrap();
    }

    let entries = memory.entries().await;
    let by_target = |t: &str| entries.iter().find(|e| e.target == t).unwrap();
    assert_eq!(score_entry(by_target("email"), &scope(), Intent::Type, "email"), 17);
    assert_eq!(
        score_entry(by_target("email address"), &scope(), Intent::Type, "email"),
        11
    );

    let hit = memory
        .find(&scope(), Intent::Type, "email", &snapshot)
        .await
        .expect("second entry resolves");
    assert_eq!(hit.element, 2);
    assert_eq!(hit.entry.target, "email address");
}

#[test]
fn test_prune_drops_expired_malformed_and_duplicate_entries() {
    let now = 100 * DAY_MS;
    let policy = RetentionPolicy::days(2, 45);
    let entries = vec![
        entry("a.com|/|click|go", now - DAY_MS),
        entry("a.com|/|click|go", now - 2 * DAY_MS),
        entry("a.com|/|click|stale", now - 46 * DAY_MS),
        entry("a.com|/|click", now),
        entry("|/|click|nohost", now),
        entry("a.com|/|click|new", now),
        entry("a.com|/|click|older", now - 3 * DAY_MS),
    ];

    let pruned = prune(entries, now, policy);
    let keys: Vec<&str> = pruned.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(keys, vec!["a.com|/|click|new", "a.com|/|click|go"]);
    assert_eq!(pruned[1].last_used, now - DAY_MS);

    let again = prune(pruned.clone(), now, policy);
    assert_eq!(again, pruned);
}

#[tokio::test]
async fn test_stored_entries_are_pruned_on_read() {
    let fresh = entry("a.com|/|click|go", now_ms());
    let ancient = entry("a.com|/|click|old", 0);
    let store = Arc::new(InMemoryStore::with_entries([(
        SKILL_STORAGE_KEY.to_string(),
        json!([fresh.clone(), ancient, {"not": "an entry"}]),
    )]));
    let memory = skills(store);

    let entries = memory.entries().await;
    assert_eq!(entries, vec![fresh]);
}

/// Counts reads and holds each one long enough for callers to pile up.
struct SlowStore {
    inner: InMemoryStore,
    reads: AtomicUsize,
    fail: bool,
}

impl SlowStore {
    fn new(fail: bool) -> Self {
        Self {
            inner: InMemoryStore::new(),
            reads: AtomicUsize::new(0),
            fail,
        }
    }
}

#[async_trait]
impl KeyValueStore for SlowStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.fail {
            return Err(StoreError::Unavailable("offline".into()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Unavailable("offline".into()));
        }
        self.inner.set(key, value).await
    }
}

#[tokio::test]
async fn test_concurrent_readers_share_one_load() {
    let store = Arc::new(SlowStore::new(false));
    let memory = skills(store.clone());

    let (a, b, c) = tokio::join!(memory.entries(), memory.entries(), memory.entries());
    assert!(a.is_empty() && b.is_empty() && c.is_empty());
    assert_eq!(store.reads.load(Ordering::SeqCst), 1);

    memory
        .learn(&scope(), Intent::Click, "go", ElementHints::default())
        .await
        .unwrap();
    assert_eq!(memory.entries().await.len(), 1);
    assert_eq!(store.reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_load_degrades_to_empty_memory() {
    let store = Arc::new(SlowStore::new(true));
    let commands = CommandMemory::new(store, &MemoryConfig::default());

    assert!(commands.entries().await.is_empty());
    assert_eq!(commands.lookup(&scope(), "clikc submit").await, None);
    assert!(
        commands
            .learn(&scope(), "clikc submit", "click submit", true)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_command_memory_is_scoped_and_normalized() {
    let commands = CommandMemory::new(Arc::new(InMemoryStore::new()), &MemoryConfig::default());

    commands
        .learn(&scope(), "Clikc   Submit!", "click submit", true)
        .await
        .unwrap();

    assert_eq!(
        commands.lookup(&scope(), "clikc submit").await.as_deref(),
        Some("click submit")
    );
    let sibling = Scope::from_url("https://shop.example.com/checkout/details?x=1").unwrap();
    assert!(commands.lookup(&sibling, "clikc submit").await.is_some());
    let other_path = Scope::from_url("https://shop.example.com/account").unwrap();
    assert_eq!(commands.lookup(&other_path, "clikc submit").await, None);
}

#[tokio::test]
async fn test_file_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("store.json");

    let store = FileStore::new(&path);
    assert_eq!(store.get("missing").await.unwrap(), None);
    store.set("a", json!({"x": 1})).await.unwrap();
    store.set("b", json!([1, 2])).await.unwrap();

    let reopened = FileStore::new(&path);
    assert_eq!(reopened.get("a").await.unwrap(), Some(json!({"x": 1})));
    assert_eq!(reopened.get("b").await.unwrap(), Some(json!([1, 2])));
}

#[tokio::test]
async fn test_file_store_backs_memories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    let first = CommandMemory::new(Arc::new(FileStore::new(&path)), &MemoryConfig::default());
    first
        .learn(&scope(), "clikc submit", "click submit", true)
        .await
        .unwrap();

    let second = CommandMemory::new(Arc::new(FileStore::new(&path)), &MemoryConfig::default());
    assert_eq!(
        second.lookup(&scope(), "clikc submit").await.as_deref(),
        Some("click submit")
    );
}

#[tokio::test]
async fn test_file_store_rejects_non_object_documents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    tokio::fs::write(&path, "[1, 2, 3]").await.unwrap();

    let err = FileStore::new(&path).get("a").await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)), "{err}");
}
