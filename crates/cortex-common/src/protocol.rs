use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic action category, independent of the literal command text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Click,
    Type,
    Scroll,
    Navigate,
    Wait,
    Script,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Click => "click",
            Intent::Type => "type",
            Intent::Scroll => "scroll",
            Intent::Navigate => "navigate",
            Intent::Wait => "wait",
            Intent::Script => "script",
        }
    }

    /// Intents that act on a specific element and may need probe scrolling.
    pub fn is_interaction(&self) -> bool {
        matches!(self, Intent::Click | Intent::Type | Intent::Scroll)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollAmount {
    Pixels(u32),
    Page,
    HalfPage,
    Small,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxKeyword {
    #[serde(rename = "max")]
    Max,
}

/// Absolute scroll position: a pixel offset or the end of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScrollOffset {
    Px(u64),
    Keyword(MaxKeyword),
}

impl ScrollOffset {
    pub const MAX: ScrollOffset = ScrollOffset::Keyword(MaxKeyword::Max);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollTo {
    pub top: ScrollOffset,
}

/// Heuristic hints describing the element an action targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl TargetHints {
    pub fn is_empty(&self) -> bool {
        self.field.is_none()
            && self.name.is_none()
            && self.label.is_none()
            && self.placeholder.is_none()
    }

    /// Human-readable description used in resolution errors.
    pub fn describe(&self) -> String {
        let parts: Vec<String> = [
            ("field", &self.field),
            ("name", &self.name),
            ("label", &self.label),
            ("placeholder", &self.placeholder),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.as_ref().map(|v| format!("{}={:?}", k, v)))
        .collect();
        parts.join(", ")
    }
}

/// How an action finds its element: explicit selectors first, then hints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Locator {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selectors: Vec<String>,
    #[serde(flatten)]
    pub hints: TargetHints,
}

impl Locator {
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty() && self.hints.is_empty()
    }

    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.selectors.is_empty() {
            parts.push(format!("selectors={:?}", self.selectors));
        }
        let hints = self.hints.describe();
        if !hints.is_empty() {
            parts.push(hints);
        }
        parts.join(", ")
    }
}

/// Fingerprint of a resolved element, cheap to persist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_test_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ElementHints {
    pub fn is_empty(&self) -> bool {
        *self == ElementHints::default()
    }

    /// Overlay `newer` onto `self`; non-empty newer values win.
    pub fn merge(&mut self, newer: &ElementHints) {
        fn take(slot: &mut Option<String>, newer: &Option<String>) {
            if let Some(v) = newer.as_ref().filter(|v| !v.is_empty()) {
                *slot = Some(v.clone());
            }
        }
        take(&mut self.tag, &newer.tag);
        take(&mut self.id, &newer.id);
        take(&mut self.name, &newer.name);
        take(&mut self.placeholder, &newer.placeholder);
        take(&mut self.aria_label, &newer.aria_label);
        take(&mut self.role, &newer.role);
        take(&mut self.data_test_id, &newer.data_test_id);
        take(&mut self.label_text, &newer.label_text);
        take(&mut self.text, &newer.text);
    }
}

// ============================================================
// Executable actions
// ============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutableAction {
    Scroll(ScrollAction),
    Click(ClickAction),
    Type(TypeAction),
    Navigate(NavigateAction),
    Wait(WaitAction),
    Script(ScriptAction),
}

impl ExecutableAction {
    pub fn intent(&self) -> Intent {
        match self {
            ExecutableAction::Scroll(_) => Intent::Scroll,
            ExecutableAction::Click(_) => Intent::Click,
            ExecutableAction::Type(_) => Intent::Type,
            ExecutableAction::Navigate(_) => Intent::Navigate,
            ExecutableAction::Wait(_) => Intent::Wait,
            ExecutableAction::Script(_) => Intent::Script,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<ScrollDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<ScrollAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_to: Option<ScrollTo>,
    /// Scroll until this element is in view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(flatten)]
    pub locator: Locator,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(flatten)]
    pub locator: Locator,
    /// Resolve against recent interaction instead of searching the document.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub use_context: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(flatten)]
    pub locator: Locator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_from: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigateAction {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitAction {
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptAction {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Pseudo-source for copy-from actions that read the user profile.
pub const PROFILE_SOURCE: &str = "profile";

// ============================================================
// Execution reporting
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorKind {
    Cortex,
    DomEngine,
    DirectPattern,
}

impl ExecutorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutorKind::Cortex => "cortex",
            ExecutorKind::DomEngine => "dom_engine",
            ExecutorKind::DirectPattern => "direct_pattern",
        }
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the first tier obtained a parseable command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPath {
    Direct,
    Memory,
    Rewrite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor: Option<ExecutorKind>,
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    #[serde(default)]
    pub attempted: Vec<ExecutorKind>,
}

// ============================================================
// User profile
// ============================================================

/// Semantic kind of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Email,
    FirstName,
    LastName,
    FullName,
    Phone,
    Address,
    City,
    State,
    Zip,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Email => "email",
            FieldKind::FirstName => "first_name",
            FieldKind::LastName => "last_name",
            FieldKind::FullName => "full_name",
            FieldKind::Phone => "phone",
            FieldKind::Address => "address",
            FieldKind::City => "city",
            FieldKind::State => "state",
            FieldKind::Zip => "zip",
        }
    }

    pub const ALL: [FieldKind; 9] = [
        FieldKind::Email,
        FieldKind::FirstName,
        FieldKind::LastName,
        FieldKind::FullName,
        FieldKind::Phone,
        FieldKind::Address,
        FieldKind::City,
        FieldKind::State,
        FieldKind::Zip,
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
}

impl UserProfile {
    pub fn value_for(&self, kind: FieldKind) -> Option<String> {
        let v = match kind {
            FieldKind::Email => self.email.clone(),
            FieldKind::FirstName => self.first_name.clone(),
            FieldKind::LastName => self.last_name.clone(),
            FieldKind::FullName => match (&self.first_name, &self.last_name) {
                (Some(f), Some(l)) => Some(format!("{} {}", f, l)),
                (Some(f), None) => Some(f.clone()),
                (None, Some(l)) => Some(l.clone()),
                (None, None) => None,
            },
            FieldKind::Phone => self.phone.clone(),
            FieldKind::Address => self.address.clone(),
            FieldKind::City => self.city.clone(),
            FieldKind::State => self.state.clone(),
            FieldKind::Zip => self.zip.clone(),
        };
        v.filter(|s| !s.is_empty())
    }
}

// ============================================================
// Message boundary
// ============================================================

/// Requests accepted from the external message-routing layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    ExecuteNaturalCommand {
        command: String,
        #[serde(default)]
        persona: Option<String>,
    },
    ParseCommand {
        command: String,
    },
    ClickElement(ElementRequest),
    TypeText(TypeTextRequest),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementRequest {
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(flatten)]
    pub hints: TargetHints,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeTextRequest {
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(flatten)]
    pub hints: TargetHints,
    pub text: String,
}
