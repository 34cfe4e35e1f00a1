//! In-process page backed by a JSON fixture.
//!
//! Coordinates in a fixture are document coordinates; snapshots report them relative to
//! the current scroll position, the way a browser reports bounding boxes. Elements
//! marked `lazy` only appear once the viewport has reached them, which models
//! infinite-scroll and lazily rendered sections.

use super::{Page, PageError, WriteMode};
use async_trait::async_trait;
use crate::resolution::Selector;
use cortex_common::dom::{
    ComputedStyle, DomElement, DomRoot, DomSnapshot, InteractionContext, NodeId, Point, Rect,
    RootKind, Viewport,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureElement {
    #[serde(flatten)]
    pub element: DomElement,
    #[serde(default)]
    pub lazy: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureRoot {
    pub id: u32,
    pub kind: RootKind,
    #[serde(default)]
    pub parent: Option<u32>,
    #[serde(default)]
    pub elements: Vec<FixtureElement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptFixture {
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default)]
    pub delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFixture {
    pub url: String,
    pub viewport: Viewport,
    #[serde(default)]
    pub roots: Vec<FixtureRoot>,
    #[serde(default)]
    pub focused: Option<NodeId>,
    #[serde(default)]
    pub context: InteractionContext,
    /// Canned results for `evaluate`, keyed by script source.
    #[serde(default)]
    pub scripts: HashMap<String, ScriptFixture>,
}

const DEFAULT_ROW_HEIGHT: f64 = 40.0;

impl PageFixture {
    /// Empty 1280x800 document at `url`.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            viewport: Viewport {
                width: 1280.0,
                height: 800.0,
                ..Default::default()
            },
            roots: vec![FixtureRoot {
                id: 0,
                kind: RootKind::Document,
                parent: None,
                elements: Vec::new(),
            }],
            focused: None,
            context: InteractionContext::default(),
            scripts: HashMap::new(),
        }
    }

    pub fn viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport.width = width;
        self.viewport.height = height;
        self
    }

    pub fn scroll_height(mut self, height: f64) -> Self {
        self.viewport.scroll_height = height;
        self
    }

    /// Add an element to the top document. Elements without an explicit position are
    /// stacked one row below the previous one.
    pub fn with(mut self, element: ElementBuilder) -> Self {
        let row = self.roots.iter().map(|r| r.elements.len()).sum::<usize>();
        let built = element.build(row);
        if let Some(doc) = self.roots.iter_mut().find(|r| r.kind == RootKind::Document) {
            doc.elements.push(built);
        }
        self
    }

    /// Add a shadow root or frame hosted by `parent`.
    pub fn with_root(
        mut self,
        id: u32,
        kind: RootKind,
        parent: u32,
        elements: Vec<ElementBuilder>,
    ) -> Self {
        let base = self.roots.iter().map(|r| r.elements.len()).sum::<usize>();
        let elements = elements
            .into_iter()
            .enumerate()
            .map(|(i, b)| b.build(base + i))
            .collect();
        self.roots.push(FixtureRoot {
            id,
            kind,
            parent: Some(parent),
            elements,
        });
        self
    }

    pub fn focused(mut self, id: NodeId) -> Self {
        self.focused = Some(id);
        self
    }

    pub fn context(mut self, context: InteractionContext) -> Self {
        self.context = context;
        self
    }

    pub fn script(mut self, code: &str, result: serde_json::Value, delay_ms: u64) -> Self {
        self.scripts
            .insert(code.to_string(), ScriptFixture { result, delay_ms });
        self
    }
}

/// Fluent constructor for fixture elements.
#[derive(Debug, Clone)]
pub struct ElementBuilder {
    element: DomElement,
    positioned: bool,
    lazy: bool,
}

pub fn el(id: NodeId, tag: &str) -> ElementBuilder {
    ElementBuilder {
        element: DomElement {
            id,
            tag: tag.to_string(),
            attributes: HashMap::new(),
            text: None,
            value: None,
            label_text: None,
            parent: None,
            rect: Rect::new(10.0, 0.0, 200.0, 24.0),
            style: ComputedStyle::default(),
            disabled: false,
        },
        positioned: false,
        lazy: false,
    }
}

impl ElementBuilder {
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.element
            .attributes
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.element.text = Some(text.to_string());
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.element.value = Some(value.to_string());
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.element.label_text = Some(label.to_string());
        self
    }

    pub fn parent(mut self, parent: NodeId) -> Self {
        self.element.parent = Some(parent);
        self
    }

    /// Document y coordinate of the element's top edge.
    pub fn at(mut self, y: f64) -> Self {
        self.element.rect.y = y;
        self.positioned = true;
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.element.rect.width = width;
        self.element.rect.height = height;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.element.style.display = Some("none".to_string());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.element.disabled = true;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    fn build(mut self, row: usize) -> FixtureElement {
        if !self.positioned {
            self.element.rect.y = 10.0 + row as f64 * DEFAULT_ROW_HEIGHT;
        }
        FixtureElement {
            element: self.element,
            lazy: self.lazy,
        }
    }
}

/// Side effects observed on a `MemoryPage`, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    ScrollIntoView(NodeId),
    ScrollTo { x: f64, y: f64 },
    Click(NodeId),
    Write {
        id: NodeId,
        value: String,
        mode: WriteMode,
    },
    Dispatch { id: NodeId, event: String },
    Navigate(String),
    Evaluate(String),
}

#[derive(Debug)]
struct PageState {
    fixture: PageFixture,
    realized: HashSet<NodeId>,
    events: Vec<PageEvent>,
    native_setter: bool,
}

impl PageState {
    fn max_scroll_y(&self) -> f64 {
        let vp = &self.fixture.viewport;
        let content_bottom = self
            .fixture
            .roots
            .iter()
            .flat_map(|r| r.elements.iter())
            .map(|e| e.element.rect.y + e.element.rect.height)
            .fold(0.0_f64, f64::max);
        let total = vp.scroll_height.max(content_bottom);
        (total - vp.height).max(0.0)
    }

    fn set_scroll(&mut self, x: f64, y: f64) {
        let max_y = self.max_scroll_y();
        let vp = &mut self.fixture.viewport;
        vp.scroll_x = x.max(0.0);
        vp.scroll_y = y.clamp(0.0, max_y);
        self.realize();
    }

    /// Render lazy elements the viewport has reached. Once rendered they stay.
    fn realize(&mut self) {
        let vp = self.fixture.viewport;
        let bottom = vp.scroll_y + vp.height;
        for fe in self.fixture.roots.iter().flat_map(|r| r.elements.iter()) {
            if fe.lazy && fe.element.rect.y < bottom {
                self.realized.insert(fe.element.id);
            }
        }
    }

    fn is_present(&self, fe: &FixtureElement) -> bool {
        !fe.lazy || self.realized.contains(&fe.element.id)
    }

    fn element(&self, id: NodeId) -> Result<&DomElement, PageError> {
        self.fixture
            .roots
            .iter()
            .flat_map(|r| r.elements.iter())
            .find(|fe| fe.element.id == id && self.is_present(fe))
            .map(|fe| &fe.element)
            .ok_or(PageError::ElementNotFound { id })
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut DomElement, PageError> {
        let realized = &self.realized;
        self.fixture
            .roots
            .iter_mut()
            .flat_map(|r| r.elements.iter_mut())
            .find(|fe| fe.element.id == id && (!fe.lazy || realized.contains(&id)))
            .map(|fe| &mut fe.element)
            .ok_or(PageError::ElementNotFound { id })
    }

    fn snapshot(&self) -> DomSnapshot {
        let vp = self.fixture.viewport;
        let mut viewport = vp;
        viewport.scroll_height = (self.max_scroll_y() + vp.height).max(vp.scroll_height);

        let roots = self
            .fixture
            .roots
            .iter()
            .map(|r| DomRoot {
                id: r.id,
                kind: r.kind,
                parent: r.parent,
                elements: r
                    .elements
                    .iter()
                    .filter(|fe| self.is_present(fe))
                    .map(|fe| {
                        let mut e = fe.element.clone();
                        e.rect.x -= vp.scroll_x;
                        e.rect.y -= vp.scroll_y;
                        e
                    })
                    .collect(),
            })
            .collect();

        DomSnapshot {
            url: self.fixture.url.clone(),
            viewport,
            roots,
            focused: self.fixture.focused,
            context: self.fixture.context,
        }
    }
}

/// A `Page` that lives entirely in memory.
#[derive(Debug)]
pub struct MemoryPage {
    state: Mutex<PageState>,
}

impl MemoryPage {
    pub fn new(fixture: PageFixture) -> Self {
        let mut state = PageState {
            fixture,
            realized: HashSet::new(),
            events: Vec::new(),
            native_setter: true,
        };
        state.realize();
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Simulate a page whose inputs reject the prototype setter.
    pub fn without_native_setter(self) -> Self {
        self.with_state(|s| s.native_setter = false);
        self
    }

    pub fn events(&self) -> Vec<PageEvent> {
        self.with_state(|s| s.events.clone())
    }

    pub fn clear_events(&self) {
        self.with_state(|s| s.events.clear());
    }

    /// Current value of a control, whether or not it has been rendered yet.
    pub fn value_of(&self, id: NodeId) -> Option<String> {
        self.with_state(|s| {
            s.fixture
                .roots
                .iter()
                .flat_map(|r| r.elements.iter())
                .find(|fe| fe.element.id == id)
                .and_then(|fe| fe.element.value.clone())
        })
    }

    pub fn scroll_position(&self) -> (f64, f64) {
        self.with_state(|s| (s.fixture.viewport.scroll_x, s.fixture.viewport.scroll_y))
    }

    /// Pretend the pointer hovered or clicked something outside of the agent's control.
    pub fn set_context(&self, context: InteractionContext) {
        self.with_state(|s| s.fixture.context = context);
    }

    pub fn set_cursor(&self, x: f64, y: f64) {
        self.with_state(|s| s.fixture.context.cursor = Some(Point { x, y }));
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut PageState) -> R) -> R {
        // a poisoned lock only means a panicking test; the state itself is still valid
        let mut guard = match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

#[async_trait]
impl Page for MemoryPage {
    async fn url(&self) -> Result<String, PageError> {
        Ok(self.with_state(|s| s.fixture.url.clone()))
    }

    async fn snapshot(&self) -> Result<DomSnapshot, PageError> {
        Ok(self.with_state(|s| s.snapshot()))
    }

    async fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, PageError> {
        let parsed = Selector::parse(selector)?;
        Ok(self.with_state(|s| {
            let snapshot = s.snapshot();
            snapshot
                .roots
                .iter()
                .filter(|r| r.kind == RootKind::Document)
                .flat_map(|r| r.elements.iter().map(move |e| (r, e)))
                .find(|(r, e)| parsed.matches(e, r))
                .map(|(_, e)| e.id)
        }))
    }

    async fn scroll_into_view(&self, id: NodeId) -> Result<(), PageError> {
        self.with_state(|s| -> Result<(), PageError> {
            let rect = s.element(id)?.rect;
            let vp = s.fixture.viewport;
            let target = rect.y + rect.height / 2.0 - vp.height / 2.0;
            s.set_scroll(vp.scroll_x, target);
            s.events.push(PageEvent::ScrollIntoView(id));
            Ok(())
        })
    }

    async fn scroll_by(&self, dx: f64, dy: f64) -> Result<(), PageError> {
        self.with_state(|s| {
            let vp = s.fixture.viewport;
            s.set_scroll(vp.scroll_x + dx, vp.scroll_y + dy);
            let vp = s.fixture.viewport;
            s.events.push(PageEvent::ScrollTo {
                x: vp.scroll_x,
                y: vp.scroll_y,
            });
        });
        Ok(())
    }

    async fn scroll_to(&self, x: f64, y: f64) -> Result<(), PageError> {
        self.with_state(|s| {
            s.set_scroll(x, y);
            let vp = s.fixture.viewport;
            s.events.push(PageEvent::ScrollTo {
                x: vp.scroll_x,
                y: vp.scroll_y,
            });
        });
        Ok(())
    }

    async fn click(&self, id: NodeId) -> Result<(), PageError> {
        self.with_state(|s| -> Result<(), PageError> {
            let el = s.element(id)?;
            if el.disabled || el.attributes.contains_key("disabled") {
                return Err(PageError::ElementNotInteractable {
                    id,
                    reason: "disabled".into(),
                });
            }
            if el.is_typeable() {
                s.fixture.focused = Some(id);
            }
            s.fixture.context.last_clicked = Some(id);
            s.events.push(PageEvent::Click(id));
            Ok(())
        })
    }

    async fn write_value(
        &self,
        id: NodeId,
        value: &str,
        mode: WriteMode,
    ) -> Result<(), PageError> {
        self.with_state(|s| -> Result<(), PageError> {
            if mode == WriteMode::NativeSetter && !s.native_setter {
                return Err(PageError::NotSupported("native value setter".into()));
            }
            let el = s.element_mut(id)?;
            if !(el.is_typeable() || el.tag == "select") {
                return Err(PageError::ElementNotInteractable {
                    id,
                    reason: format!("<{}> does not take a value", el.tag),
                });
            }
            el.value = Some(value.to_string());
            s.fixture.focused = Some(id);
            s.events.push(PageEvent::Write {
                id,
                value: value.to_string(),
                mode,
            });
            Ok(())
        })
    }

    async fn dispatch_event(&self, id: NodeId, event: &str) -> Result<(), PageError> {
        self.with_state(|s| -> Result<(), PageError> {
            s.element(id)?;
            s.events.push(PageEvent::Dispatch {
                id,
                event: event.to_string(),
            });
            Ok(())
        })
    }

    async fn read_value(&self, id: NodeId) -> Result<Option<String>, PageError> {
        self.with_state(|s| -> Result<Option<String>, PageError> {
            Ok(s.element(id)?.value.clone())
        })
    }

    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        if url.trim().is_empty() {
            return Err(PageError::Navigation("empty url".into()));
        }
        self.with_state(|s| {
            s.fixture.url = url.to_string();
            s.fixture.context = InteractionContext::default();
            s.fixture.focused = None;
            s.events.push(PageEvent::Navigate(url.to_string()));
        });
        Ok(())
    }

    async fn evaluate(&self, code: &str) -> Result<serde_json::Value, PageError> {
        let script = self.with_state(|s| {
            s.events.push(PageEvent::Evaluate(code.to_string()));
            s.fixture.scripts.get(code).cloned()
        });
        let script =
            script.ok_or_else(|| PageError::ScriptError(format!("unknown script: {}", code)))?;
        if script.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(script.delay_ms)).await;
        }
        Ok(script.result)
    }
}
