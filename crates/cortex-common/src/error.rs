use crate::dom::NodeId;

/// Errors raised by a `Page` implementation.
#[derive(thiserror::Error, Debug, Clone)]
pub enum PageError {
    // ============================================================
    // Element Errors
    // ============================================================
    #[error("Element {id} not found")]
    ElementNotFound { id: NodeId },

    #[error("Element {id} is not interactable: {reason}")]
    ElementNotInteractable { id: NodeId, reason: String },

    #[error("Invalid selector: {selector}")]
    SelectorInvalid { selector: String },

    // ============================================================
    // Execution Errors
    // ============================================================
    #[error("Script execution error: {0}")]
    ScriptError(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    // ============================================================
    // System Errors
    // ============================================================
    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Page backend error: {0}")]
    Backend(String),
}

/// Errors raised by a persistent key-value store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
