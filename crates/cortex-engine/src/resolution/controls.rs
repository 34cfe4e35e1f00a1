//! Recognizing clickable and submitting controls.

use cortex_common::dom::DomElement;
use cortex_common::text::normalize_text;

const SUBMIT_WORDS: &[&str] = &[
    "submit",
    "send",
    "place order",
    "confirm order",
    "sign up",
    "register",
];

/// Controls that submit a form when clicked.
pub fn is_submit_control(el: &DomElement) -> bool {
    if matches!(el.tag.as_str(), "input" | "button")
        && el.attr("type").is_some_and(|t| t.eq_ignore_ascii_case("submit"))
    {
        return true;
    }
    let Some(text) = clickable_text(el) else {
        return false;
    };
    SUBMIT_WORDS
        .iter()
        .any(|w| text == *w || text.starts_with(&format!("{} ", w)))
}

/// Normalized visible text of a clickable control.
pub fn clickable_text(el: &DomElement) -> Option<String> {
    [
        el.text.as_deref(),
        el.attr("value"),
        el.attr("aria-label"),
        el.attr("title"),
    ]
    .into_iter()
    .flatten()
    .map(normalize_text)
    .find(|t| !t.is_empty())
}
