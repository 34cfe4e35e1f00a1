use async_trait::async_trait;
use cortex_engine::config::{CortexConfig, RuntimeConfig};
use cortex_engine::executor::EXHAUSTED;
use cortex_engine::formatter::format_result;
use cortex_engine::memory::{CommandMemory, InMemoryStore, KeyValueStore, Scope};
use cortex_engine::page::{MemoryPage, NoopOverlay, PageEvent, PageFixture, el};
use cortex_engine::profile::{PROFILE_KEY, StoreProfileSource};
use cortex_engine::protocol::ExecutorKind;
use cortex_engine::runtime::ActionRuntime;
use cortex_engine::strategy::{
    DirectPatternStrategy, DomEngineStrategy, Strategy, StrategyContext, StrategyError,
    StrategyOutcome,
};
use cortex_engine::{Agent, PageSession, ResilientExecutor};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn config() -> CortexConfig {
    CortexConfig {
        runtime: RuntimeConfig::immediate(),
        ..Default::default()
    }
}

fn profile_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::with_entries([(
        PROFILE_KEY.to_string(),
        json!({ "firstName": "Ada", "lastName": "Lovelace", "email": "ada@example.com" }),
    )]))
}

fn signup_page() -> Arc<MemoryPage> {
    Arc::new(MemoryPage::new(
        PageFixture::new("https://example.com/signup")
            .with(el(1, "input").attr("name", "first_name"))
            .with(el(2, "input").attr("name", "email").attr("type", "email"))
            .with(el(3, "input").attr("name", "phone").attr("type", "tel"))
            .with(el(4, "button").attr("type", "submit").text("Submit")),
    ))
}

fn agent(page: &Arc<MemoryPage>, store: Arc<dyn KeyValueStore>) -> Agent {
    Agent::new(page.clone(), store, Arc::new(NoopOverlay), &config())
}

fn runtime(page: &Arc<MemoryPage>, store: Arc<dyn KeyValueStore>) -> Arc<ActionRuntime> {
    Arc::new(ActionRuntime::new(
        page.clone(),
        Arc::new(NoopOverlay),
        Arc::new(StoreProfileSource::new(store)),
        &config(),
    ))
}

fn clicks(page: &MemoryPage) -> Vec<u32> {
    page.events()
        .into_iter()
        .filter_map(|e| match e {
            PageEvent::Click(id) => Some(id),
            _ => None,
        })
        .collect()
}

struct StubStrategy {
    kind: ExecutorKind,
    succeed: bool,
    repair: Option<&'static str>,
    calls: Arc<AtomicUsize>,
}

impl StubStrategy {
    fn new(kind: ExecutorKind, succeed: bool) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let stub = Self {
            kind,
            succeed,
            repair: None,
            calls: calls.clone(),
        };
        (stub, calls)
    }
}

#[async_trait]
impl Strategy for StubStrategy {
    fn kind(&self) -> ExecutorKind {
        self.kind
    }

    async fn execute(
        &self,
        command: &str,
        _ctx: &StrategyContext<'_>,
    ) -> Result<StrategyOutcome, StrategyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.succeed {
            return Err(StrategyError::NothingToDo(command.to_string()));
        }
        Ok(StrategyOutcome {
            result: json!({ "handledBy": self.kind }),
            repair: self.repair.map(str::to_string),
        })
    }
}

fn stub_executor(
    page: &Arc<MemoryPage>,
    store: Arc<dyn KeyValueStore>,
    strategies: Vec<Box<dyn Strategy>>,
) -> ResilientExecutor {
    let commands = Arc::new(CommandMemory::new(store.clone(), &config().memory));
    ResilientExecutor::new(runtime(page, store), commands).with_strategies(strategies)
}

#[tokio::test]
async fn test_tiers_run_in_order_until_one_succeeds() {
    let page = signup_page();
    let (first, first_calls) = StubStrategy::new(ExecutorKind::Cortex, false);
    let (second, second_calls) = StubStrategy::new(ExecutorKind::DomEngine, true);
    let (third, third_calls) = StubStrategy::new(ExecutorKind::DirectPattern, true);
    let executor = stub_executor(
        &page,
        Arc::new(InMemoryStore::new()),
        vec![Box::new(first), Box::new(second), Box::new(third)],
    );

    let session = PageSession::new();
    let result = executor.execute("anything", &session, None).await;
    assert!(result.ok);
    assert_eq!(result.executor, Some(ExecutorKind::DomEngine));
    assert_eq!(
        result.attempted,
        vec![ExecutorKind::Cortex, ExecutorKind::DomEngine]
    );
    assert_eq!(result.result["handledBy"], "dom_engine");
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    assert_eq!(third_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_exhausted_tiers_report_every_attempt() {
    let page = signup_page();
    let tiers: Vec<Box<dyn Strategy>> = [
        ExecutorKind::Cortex,
        ExecutorKind::DomEngine,
        ExecutorKind::DirectPattern,
    ]
    .into_iter()
    .map(|kind| Box::new(StubStrategy::new(kind, false).0) as Box<dyn Strategy>)
    .collect();
    let executor = stub_executor(&page, Arc::new(InMemoryStore::new()), tiers);

    let result = executor
        .execute("frobnicate the widget", &PageSession::new(), None)
        .await;
    assert!(!result.ok);
    assert_eq!(result.executor, None);
    assert_eq!(result.error.as_deref(), Some(EXHAUSTED));
    assert_eq!(result.result, Value::Null);
    assert_eq!(result.attempted.len(), 3);
}

#[tokio::test]
async fn test_repair_from_any_tier_is_remembered() {
    let page = signup_page();
    let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
    let (mut stub, _) = StubStrategy::new(ExecutorKind::DomEngine, true);
    stub.repair = Some("click submit");
    let executor = stub_executor(&page, store, vec![Box::new(stub)]);

    let result = executor
        .execute("clik submt", &PageSession::new(), None)
        .await;
    assert!(result.ok);

    let scope = Scope::from_url("https://example.com/signup").unwrap();
    assert_eq!(
        executor.commands().lookup(&scope, "Clik  submt!").await.as_deref(),
        Some("click submit")
    );
    let other = Scope::from_url("https://other.example.com/signup").unwrap();
    assert_eq!(executor.commands().lookup(&other, "clik submt").await, None);
}

#[tokio::test]
async fn test_misspelled_command_is_repaired_then_recalled() {
    let page = Arc::new(MemoryPage::new(
        PageFixture::new("https://shop.example.com/checkout/review").with(
            el(1, "button")
                .attr("id", "place-order")
                .attr("type", "submit")
                .text("Submit"),
        ),
    ));
    let agent = agent(&page, Arc::new(InMemoryStore::new()));

    let first = agent.run("clikc submit", None).await;
    assert!(first.ok, "{:?}", first.error);
    assert_eq!(first.executor, Some(ExecutorKind::Cortex));
    assert_eq!(first.result["recoveryPath"], "rewrite");
    assert_eq!(first.result["repaired"], true);
    assert_eq!(first.result["canonicalCommand"], "click submit");
    assert_eq!(first.result["outcome"]["resolvedBy"], "heuristic");
    assert!(format_result(&first).contains("Understood as \"click submit\" (via rewrite)"));

    let second = agent.run("clikc submit", None).await;
    assert!(second.ok, "{:?}", second.error);
    assert_eq!(second.result["recoveryPath"], "memory");
    assert_eq!(second.result["outcome"]["resolvedBy"], "memory");
    assert_eq!(clicks(&page), vec![1, 1]);

    let entries = agent.executor().commands().entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].command, "clikc submit");
    assert_eq!(entries[0].canonical_command, "click submit");
    assert_eq!(entries[0].success_count, 2);
    assert_eq!(entries[0].repaired_count, 2);
}

#[tokio::test]
async fn test_direct_parse_is_not_remembered() {
    let page = signup_page();
    let agent = agent(&page, profile_store());

    let result = agent.run("click submit", None).await;
    assert!(result.ok, "{:?}", result.error);
    assert_eq!(result.result["repaired"], false);
    assert!(agent.executor().commands().entries().await.is_empty());
}

#[tokio::test]
async fn test_fill_the_form_falls_through_to_dom_engine() {
    let page = signup_page();
    let agent = agent(&page, profile_store());

    let result = agent.run("fill out the form", None).await;
    assert!(result.ok, "{:?}", result.error);
    assert_eq!(result.executor, Some(ExecutorKind::DomEngine));
    assert_eq!(
        result.attempted,
        vec![ExecutorKind::Cortex, ExecutorKind::DomEngine]
    );
    assert_eq!(result.result["action"], "fill_form");
    assert_eq!(result.result["filled"].as_array().map(Vec::len), Some(2));

    assert_eq!(page.value_of(1).as_deref(), Some("Ada"));
    assert_eq!(page.value_of(2).as_deref(), Some("ada@example.com"));
    // no phone in the profile
    assert_eq!(page.value_of(3), None);
    assert!(clicks(&page).is_empty());
}

#[tokio::test]
async fn test_no_submit_guard_blocks_fallback_tiers() {
    let page = signup_page();
    let store = profile_store();
    let agent = agent(&page, store.clone());

    let result = agent.run("do not submit", None).await;
    assert!(result.ok, "{:?}", result.error);
    assert_eq!(result.executor, Some(ExecutorKind::DirectPattern));
    assert!(agent.session().no_submit());

    let runtime = runtime(&page, store);
    let ctx = StrategyContext {
        session: agent.session(),
        persona: None,
    };
    let dom = DomEngineStrategy::new(runtime.clone());
    let err = dom.execute("press submit", &ctx).await.unwrap_err();
    assert!(matches!(err, StrategyError::Blocked(_)), "{err}");

    let direct = DirectPatternStrategy::new(runtime);
    let err = direct.execute("submit the form", &ctx).await.unwrap_err();
    assert!(matches!(err, StrategyError::Blocked(_)), "{err}");
    assert!(clicks(&page).is_empty());

    let result = agent.run("allow submit", None).await;
    assert!(result.ok, "{:?}", result.error);
    assert!(!agent.session().no_submit());
    let outcome = direct.execute("submit the form", &ctx).await.unwrap();
    assert_eq!(outcome.result["element"], 4);
    assert_eq!(clicks(&page), vec![4]);
}

#[tokio::test]
async fn test_no_submit_guard_stops_direct_clicks() {
    let page = signup_page();
    let agent = agent(&page, profile_store());

    let result = agent.run("do not submit", None).await;
    assert!(result.ok, "{:?}", result.error);

    let result = agent.run("click submit", None).await;
    assert!(!result.ok);
    assert_eq!(result.executor, Some(ExecutorKind::Cortex));
    // blocked, not failed: later tiers never get a turn
    assert_eq!(result.attempted, vec![ExecutorKind::Cortex]);
    assert!(
        result
            .error
            .as_deref()
            .is_some_and(|e| e.contains("Submitting is turned off")),
        "{:?}",
        result.error
    );
    assert!(clicks(&page).is_empty());
    assert!(agent.skills().entries().await.is_empty());

    let result = agent.run("allow submit", None).await;
    assert!(result.ok, "{:?}", result.error);
    let result = agent.run("click submit", None).await;
    assert!(result.ok, "{:?}", result.error);
    assert_eq!(clicks(&page), vec![4]);
}

#[tokio::test]
async fn test_step_mode_fills_one_field_per_command() {
    let page = signup_page();
    let agent = agent(&page, profile_store());

    let result = agent.run("fill one field at a time", None).await;
    assert!(result.ok, "{:?}", result.error);
    assert_eq!(result.executor, Some(ExecutorKind::DirectPattern));
    assert_eq!(result.result["element"], 1);
    assert_eq!(result.result["remaining"], 1);
    assert_eq!(result.result["done"], false);
    assert!(agent.session().step_mode());
    assert_eq!(page.value_of(2), None);

    let result = agent.run("next", None).await;
    assert!(result.ok, "{:?}", result.error);
    assert_eq!(result.result["element"], 2);
    assert_eq!(result.result["done"], true);
    assert_eq!(page.value_of(2).as_deref(), Some("ada@example.com"));

    let result = agent.run("next", None).await;
    assert!(result.ok, "{:?}", result.error);
    assert_eq!(result.result["done"], true);
    assert_eq!(result.result["remaining"], 0);
    assert!(!agent.session().step_mode());

    let result = agent.run("next", None).await;
    assert!(!result.ok);
    assert_eq!(result.error.as_deref(), Some(EXHAUSTED));
}

#[tokio::test]
async fn test_dom_engine_click_by_similar_text() {
    let page = Arc::new(MemoryPage::new(
        PageFixture::new("https://example.com/account")
            .with(el(1, "a").attr("href", "/settings").text("Account settings"))
            .with(el(2, "button").text("Sign out")),
    ));
    let runtime = runtime(&page, Arc::new(InMemoryStore::new()));
    let session = PageSession::new();
    let ctx = StrategyContext {
        session: &session,
        persona: None,
    };

    let outcome = DomEngineStrategy::new(runtime.clone())
        .execute("click sign-out", &ctx)
        .await
        .unwrap();
    assert_eq!(outcome.result["element"], 2);

    let err = DomEngineStrategy::new(runtime)
        .execute("don't click sign out", &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, StrategyError::NothingToDo(_)), "{err}");
    assert_eq!(clicks(&page), vec![2]);
}

#[tokio::test]
async fn test_direct_pattern_types_into_named_field() {
    let page = signup_page();
    let runtime = runtime(&page, Arc::new(InMemoryStore::new()));
    let session = PageSession::new();
    let ctx = StrategyContext {
        session: &session,
        persona: None,
    };

    let outcome = DirectPatternStrategy::new(runtime)
        .execute("type 'Ada' into the first name field", &ctx)
        .await
        .unwrap();
    assert_eq!(outcome.result["element"], 1);
    assert_eq!(page.value_of(1).as_deref(), Some("Ada"));
}
