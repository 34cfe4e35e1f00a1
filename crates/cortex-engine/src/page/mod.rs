//! Ports to the live page and the visual overlay.

pub mod memory;

use async_trait::async_trait;
pub use cortex_common::error::PageError;
use cortex_common::dom::{DomSnapshot, NodeId};

pub use memory::{ElementBuilder, MemoryPage, PageEvent, PageFixture, el};

/// How a value is written into a form control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Go through the element prototype's value setter so framework-managed inputs notice.
    NativeSetter,
    /// Assign the value property directly.
    Direct,
}

/// The live document an agent acts on.
///
/// Element handles are `NodeId`s taken from the most recent snapshot. Implementations
/// use interior mutability so one page can be shared by every execution tier.
#[async_trait]
pub trait Page: Send + Sync {
    async fn url(&self) -> Result<String, PageError>;

    /// Capture the current document tree, including shadow roots and frames.
    async fn snapshot(&self) -> Result<DomSnapshot, PageError>;

    /// Document-level `querySelector`. Does not pierce shadow roots.
    async fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, PageError>;

    async fn scroll_into_view(&self, id: NodeId) -> Result<(), PageError>;

    async fn scroll_by(&self, dx: f64, dy: f64) -> Result<(), PageError>;

    async fn scroll_to(&self, x: f64, y: f64) -> Result<(), PageError>;

    async fn click(&self, id: NodeId) -> Result<(), PageError>;

    /// Write a value into a form control. Returns `PageError::NotSupported` when the
    /// requested mode is unavailable for this element.
    async fn write_value(&self, id: NodeId, value: &str, mode: WriteMode)
    -> Result<(), PageError>;

    async fn dispatch_event(&self, id: NodeId, event: &str) -> Result<(), PageError>;

    async fn read_value(&self, id: NodeId) -> Result<Option<String>, PageError>;

    async fn navigate(&self, url: &str) -> Result<(), PageError>;

    /// Evaluate a script in the page context.
    async fn evaluate(&self, _code: &str) -> Result<serde_json::Value, PageError> {
        Err(PageError::NotSupported("evaluate".into()))
    }
}

/// Visual feedback drawn over the page while an action runs.
#[async_trait]
pub trait Overlay: Send + Sync {
    async fn highlight(&self, id: NodeId, label: &str);

    async fn feedback(&self, id: NodeId, success: bool);

    async fn clear(&self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOverlay;

#[async_trait]
impl Overlay for NoopOverlay {
    async fn highlight(&self, _id: NodeId, _label: &str) {}

    async fn feedback(&self, _id: NodeId, _success: bool) {}

    async fn clear(&self) {}
}

/// Overlay that only reports to the log. Used by the CLI.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOverlay;

#[async_trait]
impl Overlay for LogOverlay {
    async fn highlight(&self, id: NodeId, label: &str) {
        tracing::debug!(element = id, label, "highlight");
    }

    async fn feedback(&self, id: NodeId, success: bool) {
        tracing::debug!(element = id, success, "feedback");
    }

    async fn clear(&self) {
        tracing::trace!("overlay cleared");
    }
}
