pub mod dom;
pub mod error;
pub mod protocol;
pub mod text;

pub use dom::{DomElement, DomRoot, DomSnapshot, NodeId, Rect, RootKind};
pub use error::{PageError, StoreError};
