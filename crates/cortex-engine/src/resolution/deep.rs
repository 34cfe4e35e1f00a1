//! Breadth-first traversal of the document, open shadow roots and same-origin frames.

use super::selector::Selector;
use cortex_common::dom::{DomElement, DomRoot, DomSnapshot, RootKind};
use std::collections::VecDeque;

/// The set of roots a deep lookup may search, in breadth-first order.
#[derive(Debug, Clone)]
pub struct DeepView<'a> {
    roots: Vec<&'a DomRoot>,
}

impl<'a> DeepView<'a> {
    /// Collect traversable roots starting at the top document, visiting at most
    /// `max_roots`. Closed shadow roots and cross-origin frames are skipped along with
    /// everything nested inside them.
    pub fn new(snapshot: &'a DomSnapshot, max_roots: usize) -> Self {
        let mut roots = Vec::new();
        let mut queue: VecDeque<&DomRoot> = snapshot
            .roots
            .iter()
            .filter(|r| r.kind == RootKind::Document && r.parent.is_none())
            .collect();

        while let Some(root) = queue.pop_front() {
            if roots.len() >= max_roots {
                tracing::debug!(max_roots, "deep traversal cap reached");
                break;
            }
            roots.push(root);
            for child in snapshot.roots.iter().filter(|r| r.parent == Some(root.id)) {
                if child.kind.is_traversable() {
                    queue.push_back(child);
                } else {
                    tracing::trace!(root = child.id, kind = ?child.kind, "skipping opaque root");
                }
            }
        }

        Self { roots }
    }

    pub fn roots(&self) -> &[&'a DomRoot] {
        &self.roots
    }

    pub fn elements(&self) -> impl Iterator<Item = &'a DomElement> + '_ {
        self.roots.iter().copied().flat_map(|r| r.elements.iter())
    }

    /// Elements paired with the root that owns them.
    pub fn elements_with_root(&self) -> impl Iterator<Item = (&'a DomRoot, &'a DomElement)> + '_ {
        self.roots
            .iter()
            .copied()
            .flat_map(|r| r.elements.iter().map(move |e| (r, e)))
    }

    pub fn root_of(&self, element: &DomElement) -> Option<&'a DomRoot> {
        self.roots
            .iter()
            .copied()
            .find(|r| r.elements.iter().any(|e| e.id == element.id))
    }

    pub fn query_all<'s>(
        &'s self,
        selector: &'s Selector,
    ) -> impl Iterator<Item = &'a DomElement> + 's {
        self.elements_with_root()
            .filter(move |(root, el)| selector.matches(el, root))
            .map(|(_, el)| el)
    }
}
