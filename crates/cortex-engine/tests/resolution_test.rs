use cortex_engine::Agent;
use cortex_engine::config::{CortexConfig, ResolverConfig, RuntimeConfig};
use cortex_engine::dom::{DomSnapshot, RootKind};
use cortex_engine::memory::InMemoryStore;
use cortex_engine::page::{MemoryPage, NoopOverlay, Page, PageEvent, PageFixture, el};
use cortex_engine::protocol::{ElementHints, Intent};
use cortex_engine::resolution::Resolver;
use cortex_parser::locator_for;
use std::collections::HashSet;
use std::sync::Arc;

async fn snapshot_of(fixture: PageFixture) -> DomSnapshot {
    MemoryPage::new(fixture).snapshot().await.unwrap()
}

fn click_target(resolver: &Resolver, phrase: &str, snapshot: &DomSnapshot) -> Option<u32> {
    resolver.find_element_by_heuristic(
        &locator_for(phrase),
        Intent::Click,
        snapshot,
        &HashSet::new(),
    )
}

const LEVEL_NAMES: [&str; 5] = ["Alpha", "Bravo", "Charlie", "Delta", "Echo"];

/// A document hosting a chain of open shadow roots, each nested in the previous one.
fn nested_shadow_page(depth: u32) -> PageFixture {
    (1..=depth).fold(
        PageFixture::new("https://shop.example.com/cart"),
        |fixture, level| {
            fixture.with_root(
                level,
                RootKind::ShadowRoot { open: true },
                level - 1,
                vec![
                    el(100 + level, "button")
                        .attr("id", &format!("level-{}", level))
                        .text(LEVEL_NAMES[(level as usize - 1) % LEVEL_NAMES.len()]),
                ],
            )
        },
    )
}

#[tokio::test]
async fn test_open_shadow_root_elements_resolve() {
    let fixture = PageFixture::new("https://shop.example.com/cart")
        .with(el(1, "a").attr("href", "/").text("Home"))
        .with_root(
            1,
            RootKind::ShadowRoot { open: true },
            0,
            vec![el(2, "button").attr("id", "checkout").text("Buy now")],
        );
    let snapshot = snapshot_of(fixture.clone()).await;
    let resolver = Resolver::default();

    assert_eq!(click_target(&resolver, "buy now", &snapshot), Some(2));
    assert_eq!(resolver.query_selector("#checkout", &snapshot).unwrap(), Some(2));
    let hints = ElementHints {
        id: Some("checkout".into()),
        ..Default::default()
    };
    assert_eq!(resolver.resolve(&hints, Intent::Click, &snapshot), Some(2));

    // the document-level query does not pierce the shadow root, the runtime still does
    let page = Arc::new(MemoryPage::new(fixture));
    assert_eq!(page.query_selector("#checkout").await.unwrap(), None);
    let config = CortexConfig {
        runtime: RuntimeConfig::immediate(),
        ..Default::default()
    };
    let agent = Agent::new(
        page.clone(),
        Arc::new(InMemoryStore::new()),
        Arc::new(NoopOverlay),
        &config,
    );
    let result = agent.run("click buy now", None).await;
    assert!(result.ok, "{:?}", result.error);
    assert!(page.events().contains(&PageEvent::Click(2)));
}

#[tokio::test]
async fn test_closed_shadow_roots_and_cross_origin_frames_are_skipped() {
    let snapshot = snapshot_of(
        PageFixture::new("https://shop.example.com/pay")
            .with_root(
                1,
                RootKind::ShadowRoot { open: false },
                0,
                vec![el(2, "button").attr("id", "pay").text("Pay")],
            )
            // open, but only reachable through the closed root
            .with_root(
                2,
                RootKind::ShadowRoot { open: true },
                1,
                vec![el(3, "button").attr("id", "pay-later").text("Pay later")],
            )
            .with_root(
                3,
                RootKind::Frame { same_origin: false },
                0,
                vec![el(4, "input").attr("name", "card_number")],
            )
            .with_root(
                4,
                RootKind::Frame { same_origin: true },
                0,
                vec![el(5, "input").attr("name", "coupon_code")],
            ),
    )
    .await;
    let resolver = Resolver::default();

    let visited: Vec<u32> = resolver.view(&snapshot).roots().iter().map(|r| r.id).collect();
    assert_eq!(visited, vec![0, 4]);

    assert_eq!(click_target(&resolver, "pay", &snapshot), None);
    assert_eq!(click_target(&resolver, "pay later", &snapshot), None);
    assert_eq!(resolver.query_selector("#pay", &snapshot).unwrap(), None);
    assert_eq!(resolver.query_selector("[name=card_number]", &snapshot).unwrap(), None);
    let card = ElementHints {
        name: Some("card_number".into()),
        ..Default::default()
    };
    assert_eq!(resolver.resolve(&card, Intent::Type, &snapshot), None);

    let coupon = ElementHints {
        name: Some("coupon_code".into()),
        ..Default::default()
    };
    assert_eq!(resolver.resolve(&coupon, Intent::Type, &snapshot), Some(5));
}

#[tokio::test]
async fn test_deep_traversal_stops_at_root_cap() {
    let snapshot = snapshot_of(nested_shadow_page(5)).await;
    let capped = Resolver::new(&ResolverConfig { max_roots: 3 });

    let visited: Vec<u32> = capped.view(&snapshot).roots().iter().map(|r| r.id).collect();
    assert_eq!(visited, vec![0, 1, 2]);
    assert_eq!(capped.query_selector("#level-2", &snapshot).unwrap(), Some(102));
    assert_eq!(capped.query_selector("#level-3", &snapshot).unwrap(), None);
    assert_eq!(click_target(&capped, "echo", &snapshot), None);

    let uncapped = Resolver::default();
    assert_eq!(uncapped.view(&snapshot).roots().len(), 6);
    assert_eq!(uncapped.query_selector("#level-5", &snapshot).unwrap(), Some(105));
    assert_eq!(click_target(&uncapped, "echo", &snapshot), Some(105));
}
