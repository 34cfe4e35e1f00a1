use cortex_engine::Agent;
use cortex_engine::config::{CortexConfig, RuntimeConfig};
use cortex_engine::dom::InteractionContext;
use cortex_engine::memory::{InMemoryStore, KeyValueStore};
use cortex_engine::page::{MemoryPage, NoopOverlay, PageEvent, PageFixture, WriteMode, el};
use cortex_engine::profile::PROFILE_KEY;
use cortex_engine::protocol::{
    ClickAction, ExecutableAction, ExecutorKind, Intent, ScriptAction, TypeAction,
};
use cortex_engine::runtime::{ResolvedBy, RuntimeError};
use cortex_parser::{build_action, parse};
use serde_json::json;
use std::sync::Arc;

fn config() -> CortexConfig {
    CortexConfig {
        runtime: RuntimeConfig::immediate(),
        ..Default::default()
    }
}

fn agent_with(
    page: &Arc<MemoryPage>,
    store: Arc<dyn KeyValueStore>,
    config: &CortexConfig,
) -> Agent {
    Agent::new(page.clone(), store, Arc::new(NoopOverlay), config)
}

fn agent(page: &Arc<MemoryPage>) -> Agent {
    agent_with(page, Arc::new(InMemoryStore::new()), &config())
}

fn action(command: &str) -> ExecutableAction {
    build_action(&parse(command).expect("command parses"))
}

fn feed(y: f64) -> Arc<MemoryPage> {
    Arc::new(MemoryPage::new(
        PageFixture::new("https://news.example.com/feed")
            .viewport(1280.0, 800.0)
            .scroll_height(8000.0)
            .with(el(1, "button").text("Load more").at(y).lazy()),
    ))
}

fn scrolls(page: &MemoryPage) -> usize {
    page.events()
        .iter()
        .filter(|e| matches!(e, PageEvent::ScrollTo { .. }))
        .count()
}

#[tokio::test]
async fn test_confirmation_field_copies_its_source() {
    let page = Arc::new(MemoryPage::new(
        PageFixture::new("https://bank.example.com/apply/identity")
            .with(el(1, "input").attr("name", "ssn").value("123-45-6789"))
            .with(el(2, "input").attr("name", "ssn_confirmation")),
    ));
    let agent = agent(&page);

    let result = agent.run("fill ssn confirmation", None).await;
    assert!(result.ok, "{:?}", result.error);
    assert_eq!(result.executor, Some(ExecutorKind::Cortex));
    assert_eq!(result.result["recoveryPath"], "direct");
    assert_eq!(result.result["outcome"]["element"], 2);
    assert_eq!(result.result["outcome"]["source"], 1);

    assert_eq!(page.value_of(2).as_deref(), Some("123-45-6789"));
    assert_eq!(page.value_of(1).as_deref(), Some("123-45-6789"));

    let events = page.events();
    let write = events
        .iter()
        .position(|e| matches!(e, PageEvent::Write { id: 2, .. }))
        .expect("value written");
    assert_eq!(
        events[write + 1..write + 3],
        [
            PageEvent::Dispatch {
                id: 2,
                event: "input".into()
            },
            PageEvent::Dispatch {
                id: 2,
                event: "change".into()
            },
        ]
    );
}

#[tokio::test]
async fn test_empty_source_field_is_an_error() {
    let page = Arc::new(MemoryPage::new(
        PageFixture::new("https://bank.example.com/apply/identity")
            .with(el(1, "input").attr("name", "ssn"))
            .with(el(2, "input").attr("name", "ssn_confirmation")),
    ));
    let agent = agent(&page);

    let err = agent
        .run_action(&action("fill ssn confirmation"), None)
        .await
        .unwrap_err();
    assert!(
        matches!(err, RuntimeError::SourceFieldEmpty { ref source_field } if source_field == "ssn"),
        "{err}"
    );
    assert_eq!(page.value_of(2), None);
}

#[tokio::test]
async fn test_probe_scrolling_reaches_lazy_element() {
    let page = feed(2000.0);
    let agent = agent(&page);

    let outcome = agent
        .run_action(&action("click load more"), None)
        .await
        .unwrap();
    assert_eq!(outcome.element, Some(1));
    assert_eq!(outcome.resolved_by, Some(ResolvedBy::Heuristic));
    // 640px per probe; the second probe brings y=2000 into view
    assert_eq!(scrolls(&page), 2);
    assert!(page.events().contains(&PageEvent::Click(1)));
}

#[tokio::test]
async fn test_probe_scrolling_gives_up_and_restores_position() {
    let page = feed(4800.0);
    let agent = agent(&page);

    let err = agent
        .run_action(&action("click load more"), None)
        .await
        .unwrap_err();
    match err {
        RuntimeError::Resolution { target, attempted } => {
            assert_eq!(target, "load more");
            assert!(attempted.contains(&"skill memory".to_string()));
            assert_eq!(attempted.last().map(String::as_str), Some("probe scrolling"));
        }
        other => panic!("expected resolution error, got {other}"),
    }
    // four probes plus the return trip
    assert_eq!(scrolls(&page), 5);
    assert_eq!(page.scroll_position(), (0.0, 0.0));
    assert!(!page.events().iter().any(|e| matches!(e, PageEvent::Click(_))));
}

#[tokio::test]
async fn test_scroll_to_top_bottom_and_by_step() {
    let page = Arc::new(MemoryPage::new(
        PageFixture::new("https://example.com/long")
            .viewport(1280.0, 800.0)
            .scroll_height(5000.0),
    ));
    let agent = agent(&page);

    assert!(agent.run("scroll to the bottom", None).await.ok);
    assert_eq!(page.scroll_position().1, 4200.0);

    assert!(agent.run("scroll to the top", None).await.ok);
    assert_eq!(page.scroll_position().1, 0.0);

    assert!(agent.run("scroll down", None).await.ok);
    assert_eq!(page.scroll_position().1, 640.0);

    assert!(agent.run("scroll up 300px", None).await.ok);
    assert_eq!(page.scroll_position().1, 340.0);
}

#[tokio::test]
async fn test_falls_back_to_direct_write_without_native_setter() {
    let page = Arc::new(
        MemoryPage::new(
            PageFixture::new("https://example.com/signup")
                .with(el(1, "input").attr("name", "email")),
        )
        .without_native_setter(),
    );
    let agent = agent(&page);

    let result = agent.run("fill email with \"jane@example.com\"", None).await;
    assert!(result.ok, "{:?}", result.error);
    assert_eq!(page.value_of(1).as_deref(), Some("jane@example.com"));

    let writes: Vec<WriteMode> = page
        .events()
        .into_iter()
        .filter_map(|e| match e {
            PageEvent::Write { mode, .. } => Some(mode),
            _ => None,
        })
        .collect();
    assert_eq!(writes, vec![WriteMode::Direct]);
}

#[tokio::test]
async fn test_profile_fill_uses_persona() {
    let page = Arc::new(MemoryPage::new(
        PageFixture::new("https://example.com/signup")
            .with(el(1, "input").attr("type", "email").attr("name", "email")),
    ));
    let store = Arc::new(InMemoryStore::with_entries([(
        PROFILE_KEY.to_string(),
        json!({
            "default": { "email": "jane@example.com" },
            "personas": { "Work": { "email": "jane@corp.example" } }
        }),
    )]));
    let agent = agent_with(&page, store, &config());

    let result = agent.run("fill email from profile", Some("work")).await;
    assert!(result.ok, "{:?}", result.error);
    assert_eq!(page.value_of(1).as_deref(), Some("jane@corp.example"));

    let result = agent.run("fill email from profile", None).await;
    assert!(result.ok, "{:?}", result.error);
    assert_eq!(page.value_of(1).as_deref(), Some("jane@example.com"));
}

#[tokio::test]
async fn test_missing_profile_value() {
    let page = Arc::new(MemoryPage::new(
        PageFixture::new("https://example.com/signup")
            .with(el(1, "input").attr("name", "phone")),
    ));
    let agent = agent(&page);

    let err = agent
        .run_action(&action("fill phone from profile"), None)
        .await
        .unwrap_err();
    assert!(
        matches!(err, RuntimeError::ProfileValueMissing { ref field } if field == "phone"),
        "{err}"
    );
}

#[tokio::test]
async fn test_untargeted_type_goes_to_focused_field() {
    let page = Arc::new(MemoryPage::new(
        PageFixture::new("https://example.com/notes")
            .with(el(1, "input").attr("name", "title"))
            .with(el(2, "textarea").attr("name", "body"))
            .focused(2),
    ));
    let agent = agent(&page);

    let outcome = agent
        .run_action(&action("type hello there"), None)
        .await
        .unwrap();
    assert_eq!(outcome.element, Some(2));
    assert_eq!(outcome.resolved_by, Some(ResolvedBy::Focus));
    assert_eq!(page.value_of(2).as_deref(), Some("hello there"));
}

#[tokio::test]
async fn test_deictic_click_uses_interaction_context() {
    let page = Arc::new(MemoryPage::new(
        PageFixture::new("https://example.com/menu")
            .with(el(1, "button").text("Open"))
            .with(el(2, "a").attr("href", "/pricing").text("Pricing")),
    ));
    page.set_context(InteractionContext {
        last_hovered: Some(2),
        ..Default::default()
    });
    let agent = agent(&page);

    let outcome = agent
        .run_action(&action("click this"), None)
        .await
        .unwrap();
    assert_eq!(outcome.element, Some(2));
    assert_eq!(outcome.resolved_by, Some(ResolvedBy::Context));
}

#[tokio::test]
async fn test_selector_beats_heuristic_and_invalid_selectors_are_skipped() {
    let page = Arc::new(MemoryPage::new(
        PageFixture::new("https://example.com/checkout")
            .with(el(1, "button").text("Continue"))
            .with(el(2, "button").attr("id", "pay").text("Pay now")),
    ));
    let agent = agent(&page);

    let click = ExecutableAction::Click(ClickAction {
        target: None,
        locator: cortex_engine::protocol::Locator {
            selectors: vec!["input[name=".into(), "#pay".into()],
            hints: Default::default(),
        },
        use_context: false,
    });
    let outcome = agent.run_action(&click, None).await.unwrap();
    assert_eq!(outcome.element, Some(2));
    assert_eq!(outcome.resolved_by, Some(ResolvedBy::Selector));
}

#[tokio::test]
async fn test_disabled_elements_are_never_targets() {
    let page = Arc::new(MemoryPage::new(
        PageFixture::new("https://example.com/checkout")
            .with(el(1, "button").text("Submit order").disabled())
            .with(el(2, "button").text("Submit").hidden()),
    ));
    let agent = agent(&page);

    let err = agent
        .run_action(&action("click submit"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Resolution { .. }), "{err}");
}

#[tokio::test]
async fn test_script_times_out() {
    let page = Arc::new(MemoryPage::new(
        PageFixture::new("https://example.com")
            .script("fast()", json!({"ok": true}), 0)
            .script("slow()", json!(1), 300),
    ));
    let agent = agent(&page);

    let fast = ExecutableAction::Script(ScriptAction {
        code: "fast()".into(),
        timeout_ms: None,
    });
    let outcome = agent.run_action(&fast, None).await.unwrap();
    assert_eq!(outcome.intent, Intent::Script);
    assert_eq!(outcome.result, Some(json!({"ok": true})));

    let slow = ExecutableAction::Script(ScriptAction {
        code: "slow()".into(),
        timeout_ms: Some(50),
    });
    let err = agent.run_action(&slow, None).await.unwrap_err();
    assert!(matches!(err, RuntimeError::ScriptTimeout(50)), "{err}");
}

#[tokio::test]
async fn test_script_timeout_is_capped() {
    let page = Arc::new(MemoryPage::new(
        PageFixture::new("https://example.com").script("slow()", json!(1), 300),
    ));
    let mut config = config();
    config.script.max_timeout_ms = 40;
    let agent = agent_with(&page, Arc::new(InMemoryStore::new()), &config);

    let slow = ExecutableAction::Script(ScriptAction {
        code: "slow()".into(),
        timeout_ms: Some(10_000),
    });
    let err = agent.run_action(&slow, None).await.unwrap_err();
    assert!(matches!(err, RuntimeError::ScriptTimeout(40)), "{err}");
}

#[tokio::test]
async fn test_batch_stops_at_first_failure() {
    let page = Arc::new(MemoryPage::new(
        PageFixture::new("https://example.com/signup")
            .with(el(1, "input").attr("name", "email"))
            .with(el(2, "input").attr("name", "city")),
    ));
    let agent = agent(&page);

    let type_into = |field: &str, value: &str| {
        ExecutableAction::Type(TypeAction {
            target: Some(field.into()),
            locator: cortex_parser::locator_for(field),
            value: Some(value.into()),
            copy_from: None,
        })
    };
    let batch = agent
        .run_batch(
            &[
                type_into("email", "jane@example.com"),
                action("click the launch button"),
                type_into("city", "Lisbon"),
            ],
            None,
        )
        .await;

    assert!(!batch.ok);
    assert_eq!(batch.completed.len(), 1);
    assert_eq!(batch.failed_at, Some(1));
    assert!(batch.error.unwrap().contains("launch"));
    assert_eq!(page.value_of(1).as_deref(), Some("jane@example.com"));
    assert_eq!(page.value_of(2), None);
}

#[tokio::test]
async fn test_navigate_resets_session_for_new_scope() {
    let page = Arc::new(MemoryPage::new(PageFixture::new(
        "https://shop.example.com/cart",
    )));
    let agent = agent(&page);
    assert!(agent.run("do not submit", None).await.ok);
    assert!(agent.session().no_submit());

    let result = agent.run("go to example.org", None).await;
    assert!(result.ok, "{:?}", result.error);
    assert_eq!(result.result["outcome"]["value"], "https://example.org");
    assert!(!agent.session().no_submit());
    assert_eq!(
        agent.session().scope().map(|s| s.host),
        Some("example.org".to_string())
    );
}
