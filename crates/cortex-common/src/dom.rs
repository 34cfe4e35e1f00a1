//! Snapshot of the live document tree as seen by the resolver.
//!
//! A `Page` implementation produces a `DomSnapshot` on demand. Resolution is a pure
//! function over the snapshot; mutations go back through the page by `NodeId`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type NodeId = u32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Viewport-relative bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub scroll_x: f64,
    #[serde(default)]
    pub scroll_y: f64,
    /// Total scrollable height of the document.
    #[serde(default)]
    pub scroll_height: f64,
}

impl Viewport {
    pub fn max_scroll_y(&self) -> f64 {
        (self.scroll_height - self.height).max(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputedStyle {
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RootKind {
    Document,
    ShadowRoot { open: bool },
    Frame { same_origin: bool },
}

impl RootKind {
    /// Whether a deep lookup is allowed to descend into this root.
    pub fn is_traversable(&self) -> bool {
        match self {
            RootKind::Document => true,
            RootKind::ShadowRoot { open } => *open,
            RootKind::Frame { same_origin } => *same_origin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomElement {
    pub id: NodeId,
    pub tag: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    /// Visible text content.
    #[serde(default)]
    pub text: Option<String>,
    /// Live value for form controls.
    #[serde(default)]
    pub value: Option<String>,
    /// Text of the `<label>` associated with this control, when the page knows it.
    #[serde(default)]
    pub label_text: Option<String>,
    #[serde(default)]
    pub parent: Option<NodeId>,
    pub rect: Rect,
    #[serde(default)]
    pub style: ComputedStyle,
    #[serde(default)]
    pub disabled: bool,
}

impl DomElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn input_type(&self) -> &str {
        self.attr("type").unwrap_or("text")
    }

    pub fn role(&self) -> Option<&str> {
        self.attr("role")
    }

    pub fn is_label(&self) -> bool {
        self.tag == "label"
    }

    /// Controls that accept typed text.
    pub fn is_typeable(&self) -> bool {
        match self.tag.as_str() {
            "textarea" => true,
            "input" => !matches!(
                self.input_type(),
                "submit"
                    | "button"
                    | "reset"
                    | "checkbox"
                    | "radio"
                    | "hidden"
                    | "file"
                    | "image"
                    | "range"
                    | "color"
            ),
            _ => {
                self.attr("contenteditable").is_some_and(|v| v != "false")
                    || self.role() == Some("textbox")
            }
        }
    }

    pub fn is_clickable(&self) -> bool {
        match self.tag.as_str() {
            "button" | "a" | "summary" => true,
            "input" => matches!(
                self.input_type(),
                "submit" | "button" | "reset" | "checkbox" | "radio" | "image"
            ),
            _ => matches!(
                self.role(),
                Some("button" | "link" | "menuitem" | "tab" | "checkbox" | "option")
            ),
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.is_typeable() || self.is_clickable() || self.tag == "select"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomRoot {
    pub id: u32,
    pub kind: RootKind,
    /// Root that hosts this one; `None` for the top document.
    #[serde(default)]
    pub parent: Option<u32>,
    #[serde(default)]
    pub elements: Vec<DomElement>,
}

/// Recent pointer interaction, used for deictic commands ("click this").
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionContext {
    #[serde(default)]
    pub last_clicked: Option<NodeId>,
    #[serde(default)]
    pub last_hovered: Option<NodeId>,
    #[serde(default)]
    pub cursor: Option<Point>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomSnapshot {
    pub url: String,
    pub viewport: Viewport,
    #[serde(default)]
    pub roots: Vec<DomRoot>,
    #[serde(default)]
    pub focused: Option<NodeId>,
    #[serde(default)]
    pub context: InteractionContext,
}

impl DomSnapshot {
    /// Elements of the top-level document only.
    pub fn document_elements(&self) -> impl Iterator<Item = &DomElement> {
        self.roots
            .iter()
            .filter(|r| r.kind == RootKind::Document)
            .flat_map(|r| r.elements.iter())
    }

    /// Look up an element in any root.
    pub fn element(&self, id: NodeId) -> Option<&DomElement> {
        self.roots
            .iter()
            .flat_map(|r| r.elements.iter())
            .find(|e| e.id == id)
    }
}
