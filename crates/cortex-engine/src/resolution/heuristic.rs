//! Token-overlap scoring for elements described only by loose hints.

use super::deep::DeepView;
use super::selector::Selector;
use super::usable::is_usable;
use cortex_common::dom::{DomElement, NodeId};
use cortex_common::protocol::{Intent, Locator};
use cortex_common::text::{normalize_text, tokenize};
use std::collections::HashSet;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "my", "your", "this", "that", "field", "input", "box", "on", "in", "into",
    "to", "of", "for", "please", "value",
];

const SYNONYMS: &[(&str, &str)] = &[
    ("first", "given"),
    ("last", "family"),
    ("last", "surname"),
    ("phone", "tel"),
    ("phone", "telephone"),
    ("email", "mail"),
    ("zip", "postal"),
];

const LONG_TOKEN_LEN: usize = 4;
const LONG_TOKEN_WEIGHT: u32 = 2;
const SHORT_TOKEN_WEIGHT: u32 = 1;
const PHRASE_BONUS: u32 = 3;
const PREFERRED_TAG_BONUS: u32 = 2;

/// Search terms derived from a locator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeuristicQuery {
    pub tokens: Vec<String>,
    pub phrase: Option<String>,
}

impl HeuristicQuery {
    pub fn from_locator(locator: &Locator) -> Self {
        let hints = &locator.hints;
        let mut raw: Vec<String> = [&hints.field, &hints.name, &hints.label, &hints.placeholder]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        for selector in &locator.selectors {
            if let Ok(parsed) = Selector::parse(selector) {
                raw.extend(parsed.hint_tokens());
            }
        }

        let mut tokens: Vec<String> = Vec::new();
        for token in raw.iter().flat_map(|r| tokenize(r)) {
            if STOP_WORDS.contains(&token.as_str()) || tokens.contains(&token) {
                continue;
            }
            tokens.push(token);
        }
        let expanded: Vec<String> = tokens
            .iter()
            .flat_map(|t| synonyms_of(t))
            .filter(|s| !tokens.iter().any(|t| t == s))
            .map(str::to_string)
            .collect();
        for s in expanded {
            if !tokens.contains(&s) {
                tokens.push(s);
            }
        }

        let phrase = [&hints.field, &hints.label, &hints.placeholder]
            .into_iter()
            .flatten()
            .map(|p| normalize_text(p))
            .find(|p| !p.is_empty());

        Self { tokens, phrase }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.phrase.is_none()
    }
}

fn synonyms_of(token: &str) -> impl Iterator<Item = &'static str> + '_ {
    SYNONYMS.iter().filter_map(move |(a, b)| {
        if *a == token {
            Some(*b)
        } else if *b == token {
            Some(*a)
        } else {
            None
        }
    })
}

/// Normalized text an element can be matched against.
pub fn haystack(el: &DomElement) -> String {
    let parts = [
        Some(el.tag.as_str()),
        el.attr("id"),
        el.attr("name"),
        el.attr("type"),
        el.attr("placeholder"),
        el.attr("aria-label"),
        el.attr("data-testid"),
        el.attr("title"),
        el.attr("role"),
        el.label_text.as_deref(),
        el.text.as_deref(),
    ];
    normalize_text(&parts.into_iter().flatten().collect::<Vec<_>>().join(" "))
}

fn accepts(intent: Intent, el: &DomElement) -> bool {
    match intent {
        Intent::Type => el.is_typeable() || el.tag == "select",
        Intent::Click => el.is_interactive(),
        Intent::Scroll => true,
        _ => el.is_interactive(),
    }
}

fn preferred_tag(intent: Intent) -> Option<&'static str> {
    match intent {
        Intent::Type => Some("input"),
        Intent::Click => Some("button"),
        _ => None,
    }
}

/// Score one element. Zero means no hint matched.
pub fn score(query: &HeuristicQuery, intent: Intent, el: &DomElement) -> u32 {
    let hay = haystack(el);
    let mut score = 0;

    for token in &query.tokens {
        if hay.contains(token.as_str()) {
            score += if token.len() >= LONG_TOKEN_LEN {
                LONG_TOKEN_WEIGHT
            } else {
                SHORT_TOKEN_WEIGHT
            };
        }
    }
    if let Some(phrase) = &query.phrase
        && hay.contains(phrase.as_str())
    {
        score += PHRASE_BONUS;
    }
    // the tag only breaks ties between elements that matched something
    if score > 0 && preferred_tag(intent).is_some_and(|t| el.tag == t) {
        score += PREFERRED_TAG_BONUS;
    }
    score
}

/// Highest-scoring usable candidate; ties go to the first in traversal order.
pub fn find_best(
    query: &HeuristicQuery,
    intent: Intent,
    view: &DeepView<'_>,
    exclude: &HashSet<NodeId>,
) -> Option<NodeId> {
    if query.is_empty() {
        return None;
    }

    let mut best: Option<(NodeId, u32)> = None;
    for el in view.elements() {
        if exclude.contains(&el.id) || !accepts(intent, el) || !is_usable(el) {
            continue;
        }
        let s = score(query, intent, el);
        if s > 0 && best.is_none_or(|(_, b)| s > b) {
            best = Some((el.id, s));
        }
    }

    if let Some((id, s)) = best {
        tracing::debug!(element = id, score = s, "heuristic match");
    }
    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_common::protocol::TargetHints;

    #[test]
    fn query_drops_stop_words_and_expands_synonyms() {
        let locator = Locator {
            selectors: vec!["#phone".into()],
            hints: TargetHints {
                field: Some("the first name field".into()),
                ..Default::default()
            },
        };
        let q = HeuristicQuery::from_locator(&locator);
        assert!(q.tokens.contains(&"first".to_string()));
        assert!(q.tokens.contains(&"name".to_string()));
        assert!(q.tokens.contains(&"given".to_string()));
        assert!(q.tokens.contains(&"phone".to_string()));
        assert!(q.tokens.contains(&"tel".to_string()));
        assert!(!q.tokens.contains(&"the".to_string()));
        assert_eq!(q.phrase.as_deref(), Some("the first name field"));
    }
}
