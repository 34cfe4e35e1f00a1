//! Keyword-frequency intent classifier.
//!
//! Only used to pick a preferred strategy for ambiguous commands and to annotate
//! responses. It never decides whether a command may run.

use cortex_common::protocol::ExecutorKind;
use cortex_common::text::tokenize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    FormFill,
    Navigation,
    Interaction,
    Scrolling,
    Waiting,
    Unknown,
}

const TAXONOMY: &[(IntentCategory, &[&str])] = &[
    (
        IntentCategory::FormFill,
        &[
            "fill", "type", "enter", "write", "input", "copy", "set", "form", "field", "email",
            "name", "address", "phone", "password", "zip", "profile", "autofill", "confirmation",
        ],
    ),
    (
        IntentCategory::Navigation,
        &["go", "navigate", "open", "visit", "url", "website", "page", "back", "link", "load"],
    ),
    (
        IntentCategory::Interaction,
        &[
            "click", "tap", "press", "select", "choose", "submit", "button", "check", "toggle",
            "hit", "this", "that",
        ],
    ),
    (
        IntentCategory::Scrolling,
        &["scroll", "up", "down", "top", "bottom", "below", "above", "fold"],
    ),
    (
        IntentCategory::Waiting,
        &["wait", "pause", "sleep", "seconds", "ms", "moment"],
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub category: IntentCategory,
    /// Share of keyword hits that went to `category`, in `[0, 1]`.
    pub confidence: f64,
    pub preferred: ExecutorKind,
}

pub fn classify(text: &str) -> Classification {
    let tokens = tokenize(text);
    let mut best = (IntentCategory::Unknown, 0usize);
    let mut total = 0usize;

    for (category, keywords) in TAXONOMY {
        let hits = tokens
            .iter()
            .filter(|t| keywords.contains(&t.as_str()))
            .count();
        total += hits;
        if hits > best.1 {
            best = (*category, hits);
        }
    }

    let confidence = if total == 0 {
        0.0
    } else {
        best.1 as f64 / total as f64
    };

    Classification {
        category: best.0,
        confidence,
        preferred: preferred_executor(best.0),
    }
}

fn preferred_executor(category: IntentCategory) -> ExecutorKind {
    match category {
        IntentCategory::FormFill => ExecutorKind::DomEngine,
        IntentCategory::Unknown => ExecutorKind::DirectPattern,
        _ => ExecutorKind::Cortex,
    }
}
