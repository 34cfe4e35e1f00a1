//! Resolving deictic targets ("click this") from recent pointer interaction.

use super::deep::DeepView;
use super::usable::is_usable;
use cortex_common::dom::{DomSnapshot, NodeId};

/// Last clicked element, then last hovered, then the smallest usable element under
/// the cursor.
pub fn resolve_from_context(snapshot: &DomSnapshot, view: &DeepView<'_>) -> Option<NodeId> {
    let ctx = &snapshot.context;

    for (source, id) in [("clicked", ctx.last_clicked), ("hovered", ctx.last_hovered)] {
        if let Some(el) = id.and_then(|id| snapshot.element(id))
            && is_usable(el)
        {
            tracing::debug!(element = el.id, source, "context match");
            return Some(el.id);
        }
    }

    let cursor = ctx.cursor?;
    view.elements()
        .filter(|e| is_usable(e) && e.rect.contains(cursor))
        .min_by(|a, b| a.rect.area().total_cmp(&b.rect.area()))
        .map(|e| e.id)
}
