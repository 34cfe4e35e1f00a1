//! Finding the on-page element an action targets.
//!
//! Everything here is a pure function over a `DomSnapshot`; the runtime takes care of
//! re-snapshotting and scrolling.

pub mod context;
pub mod controls;
pub mod deep;
pub mod field_kind;
pub mod heuristic;
pub mod hints;
pub mod selector;
pub mod usable;

use crate::config::ResolverConfig;
use cortex_common::dom::{DomElement, DomSnapshot, NodeId};
use cortex_common::error::PageError;
use cortex_common::protocol::{ElementHints, Intent, Locator};
use std::collections::HashSet;

pub use controls::{clickable_text, is_submit_control};
pub use deep::DeepView;
pub use field_kind::{infer_field_kind, kind_for_phrase};
pub use heuristic::HeuristicQuery;
pub use selector::Selector;
pub use usable::is_usable;

const FINGERPRINT_TEXT_MAX: usize = 80;

#[derive(Debug, Clone)]
pub struct Resolver {
    max_roots: usize,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(&ResolverConfig::default())
    }
}

impl Resolver {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            max_roots: config.max_roots,
        }
    }

    pub fn view<'a>(&self, snapshot: &'a DomSnapshot) -> DeepView<'a> {
        DeepView::new(snapshot, self.max_roots)
    }

    /// Re-derive a live element from a stored fingerprint.
    pub fn resolve(
        &self,
        hints: &ElementHints,
        intent: Intent,
        snapshot: &DomSnapshot,
    ) -> Option<NodeId> {
        hints::resolve_hints(hints, intent, &self.view(snapshot))
    }

    /// Score every candidate against the locator's hints.
    pub fn find_element_by_heuristic(
        &self,
        locator: &Locator,
        intent: Intent,
        snapshot: &DomSnapshot,
        exclude: &HashSet<NodeId>,
    ) -> Option<NodeId> {
        let query = HeuristicQuery::from_locator(locator);
        heuristic::find_best(&query, intent, &self.view(snapshot), exclude)
    }

    pub fn resolve_from_context(&self, snapshot: &DomSnapshot) -> Option<NodeId> {
        context::resolve_from_context(snapshot, &self.view(snapshot))
    }

    /// First usable element matching `selector` in any traversable root.
    pub fn query_selector(
        &self,
        selector: &str,
        snapshot: &DomSnapshot,
    ) -> Result<Option<NodeId>, PageError> {
        let parsed = Selector::parse(selector)?;
        let view = self.view(snapshot);
        let found = view.query_all(&parsed).find(|e| is_usable(e)).map(|e| e.id);
        Ok(found)
    }

    /// Focused control if it takes text, otherwise the first usable text field.
    pub fn typing_target(&self, snapshot: &DomSnapshot) -> Option<NodeId> {
        if let Some(el) = snapshot.focused.and_then(|id| snapshot.element(id))
            && el.is_typeable()
            && is_usable(el)
        {
            return Some(el.id);
        }
        self.view(snapshot)
            .elements()
            .find(|e| e.is_typeable() && is_usable(e))
            .map(|e| e.id)
    }

    /// Usable typeable controls in traversal order.
    pub fn text_fields<'a>(&self, snapshot: &'a DomSnapshot) -> Vec<&'a DomElement> {
        self.view(snapshot)
            .elements()
            .filter(|e| e.is_typeable() && is_usable(e))
            .collect()
    }

    /// Usable clickable elements in traversal order.
    pub fn clickables<'a>(&self, snapshot: &'a DomSnapshot) -> Vec<&'a DomElement> {
        self.view(snapshot)
            .elements()
            .filter(|e| e.is_clickable() && is_usable(e))
            .collect()
    }
}

/// Persistable description of an element, enough to find it again later.
pub fn fingerprint(el: &DomElement) -> ElementHints {
    let owned = |v: Option<&str>| v.map(str::to_string);
    let text = el
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.chars().take(FINGERPRINT_TEXT_MAX).collect());

    ElementHints {
        tag: Some(el.tag.clone()),
        id: owned(el.attr("id")),
        name: owned(el.attr("name")),
        placeholder: owned(el.attr("placeholder")),
        aria_label: owned(el.attr("aria-label")),
        role: owned(el.role()),
        data_test_id: owned(el.attr("data-testid")),
        label_text: el.label_text.clone().filter(|l| !l.is_empty()),
        text,
    }
}
