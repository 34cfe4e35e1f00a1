//! Re-deriving a live element from a stored fingerprint.

use super::deep::DeepView;
use super::usable::is_usable;
use cortex_common::dom::{DomElement, DomRoot, NodeId};
use cortex_common::protocol::{ElementHints, Intent};
use cortex_common::text::normalize_text;

/// Tiered lookup, first hit wins: exact id, unique identifying attribute, label
/// association, then (clicks only) fuzzy clickable text.
pub fn resolve_hints(hints: &ElementHints, intent: Intent, view: &DeepView<'_>) -> Option<NodeId> {
    by_id(hints, view)
        .or_else(|| by_unique_attribute(hints, view))
        .or_else(|| by_label(hints, view))
        .or_else(|| {
            if intent == Intent::Click {
                by_clickable_text(hints, view)
            } else {
                None
            }
        })
}

fn by_id(hints: &ElementHints, view: &DeepView<'_>) -> Option<NodeId> {
    let id = hints.id.as_deref().filter(|v| !v.is_empty())?;
    view.elements()
        .find(|e| e.attr("id") == Some(id) && is_usable(e))
        .map(|e| e.id)
}

fn by_unique_attribute(hints: &ElementHints, view: &DeepView<'_>) -> Option<NodeId> {
    let probes = [
        ("name", &hints.name),
        ("aria-label", &hints.aria_label),
        ("data-testid", &hints.data_test_id),
        ("placeholder", &hints.placeholder),
    ];

    for (attr, value) in probes {
        let Some(value) = value.as_deref().filter(|v| !v.is_empty()) else {
            continue;
        };
        let mut matches = view.elements().filter(|e| e.attr(attr) == Some(value));
        if let (Some(only), None) = (matches.next(), matches.next())
            && is_usable(only)
        {
            return Some(only.id);
        }
    }
    None
}

fn by_label(hints: &ElementHints, view: &DeepView<'_>) -> Option<NodeId> {
    let needle = normalize_text(hints.label_text.as_deref()?);
    if needle.is_empty() {
        return None;
    }

    for (root, label) in view.elements_with_root().filter(|(_, e)| e.is_label()) {
        let text = normalize_text(label.text.as_deref().unwrap_or_default());
        if text.is_empty() || !text.contains(&needle) {
            continue;
        }
        if let Some(control) = associated_control(label, root, view) {
            return Some(control.id);
        }
    }

    // pages that report label text on the control itself
    view.elements()
        .find(|e| {
            e.is_interactive()
                && is_usable(e)
                && e.label_text
                    .as_deref()
                    .is_some_and(|l| normalize_text(l).contains(&needle))
        })
        .map(|e| e.id)
}

/// The control a `<label>` points at: `for` target, nested control, or the next
/// sibling control.
pub fn associated_control<'a>(
    label: &DomElement,
    root: &'a DomRoot,
    view: &DeepView<'a>,
) -> Option<&'a DomElement> {
    let is_control = |e: &DomElement| e.is_interactive() && !e.is_label() && is_usable(e);

    if let Some(target) = label.attr("for") {
        return view
            .elements()
            .find(|e| e.attr("id") == Some(target))
            .filter(|e| is_control(e));
    }

    let nested = root
        .elements
        .iter()
        .find(|e| is_control(e) && is_descendant_of(e, label.id, root));
    if nested.is_some() {
        return nested;
    }

    root.elements
        .iter()
        .skip_while(|e| e.id != label.id)
        .skip(1)
        .filter(|e| e.parent == label.parent)
        .find(|e| is_control(e))
}

fn is_descendant_of(el: &DomElement, ancestor: NodeId, root: &DomRoot) -> bool {
    let mut parent = el.parent;
    // bounded in case parent links form a cycle
    for _ in 0..root.elements.len() {
        let Some(pid) = parent else {
            return false;
        };
        if pid == ancestor {
            return true;
        }
        parent = root.elements.iter().find(|p| p.id == pid).and_then(|p| p.parent);
    }
    false
}

fn by_clickable_text(hints: &ElementHints, view: &DeepView<'_>) -> Option<NodeId> {
    let needle = normalize_text(
        hints
            .text
            .as_deref()
            .or(hints.aria_label.as_deref())
            .filter(|t| !t.is_empty())?,
    );
    if needle.is_empty() {
        return None;
    }

    view.elements()
        .filter(|e| e.is_clickable() && is_usable(e))
        .find(|e| {
            let text = normalize_text(
                e.text
                    .as_deref()
                    .or(e.attr("value"))
                    .or(e.attr("aria-label"))
                    .unwrap_or_default(),
            );
            !text.is_empty() && (text.contains(&needle) || needle.contains(&text))
        })
        .map(|e| e.id)
}
