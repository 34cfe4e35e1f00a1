//! Mechanical rewrites tried when a command does not parse as written.

use crate::normalizer::{fix_word, normalize};
use regex::Regex;
use std::sync::LazyLock;
use strsim::damerau_levenshtein;

/// Verbs the parser understands, in preference order for typo repair.
const KNOWN_VERBS: &[&str] = &[
    "click", "fill", "type", "scroll", "copy", "write", "enter", "select", "press", "tap",
    "navigate", "open", "visit", "wait", "set", "put", "confirm", "choose", "hit", "input",
    "populate", "autofill", "pause", "sleep", "load", "page", "browse", "jump", "move", "go",
];

/// Field words worth fuzzy-repairing beyond the fixed misspelling table.
const FIELD_WORDS: &[&str] = &[
    "confirmation",
    "address",
    "password",
    "submit",
    "button",
    "continue",
    "phone",
    "email",
    "first",
    "last",
    "name",
];

static FILL_COPY_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^fill\s+(.+?)\s+copy\s+from\s+(.+)$").expect("valid rewrite regex")
});
static COPY_FROM_INTO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^copy\s+from\s+(.+?)\s+(?:into|to)\s+(.+)$").expect("valid rewrite regex")
});
static COPY_INTO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^copy\s+(.+?)\s+(?:into|to)\s+(.+)$").expect("valid rewrite regex")
});

/// Candidate rewrites of `input`, most conservative first.
///
/// Never contains `input` itself (compared after normalization) and never repeats a candidate.
pub fn rewrite_candidates(input: &str) -> Vec<String> {
    let base = normalize(input);
    let mut candidates: Vec<String> = Vec::new();
    let mut push = |c: String| {
        if !c.is_empty()
            && !c.eq_ignore_ascii_case(&base)
            && !candidates.iter().any(|e| e.eq_ignore_ascii_case(&c))
        {
            candidates.push(c);
        }
    };

    let spelled = fix_spelling(&base);
    push(spelled.clone());

    for text in [&base, &spelled] {
        if let Some(folded) = fold_copy_phrasing(text) {
            push(folded);
        }
    }

    candidates
}

/// Repair a mistyped leading verb and fuzzy-misspelled field words.
pub fn fix_spelling(input: &str) -> String {
    let mut words: Vec<String> = input.split_whitespace().map(str::to_string).collect();
    if words.is_empty() {
        return String::new();
    }

    if let Some(verb) = closest(&words[0], KNOWN_VERBS) {
        words[0] = verb.to_string();
    }

    for word in words.iter_mut().skip(1) {
        if let Some(fix) = fix_word(word) {
            *word = fix.to_string();
        } else if word.len() >= 5
            && let Some(fix) = closest(word, FIELD_WORDS)
        {
            *word = fix.to_string();
        }
    }

    words.join(" ")
}

/// Fold the copy phrasings onto the canonical "fill TARGET from SOURCE".
pub fn fold_copy_phrasing(input: &str) -> Option<String> {
    if let Some(c) = FILL_COPY_FROM.captures(input) {
        return Some(format!("fill {} from {}", &c[1], &c[2]));
    }
    if let Some(c) = COPY_FROM_INTO.captures(input) {
        return Some(format!("fill {} from {}", &c[2], &c[1]));
    }
    if let Some(c) = COPY_INTO.captures(input) {
        return Some(format!("fill {} from {}", &c[2], &c[1]));
    }
    None
}

/// Closest vocabulary word within edit distance, or `None` if `word` is already known
/// or nothing is close enough.
fn closest(word: &str, vocabulary: &[&'static str]) -> Option<&'static str> {
    let lower = word.to_lowercase();
    if lower.len() < 3 || vocabulary.contains(&lower.as_str()) {
        return None;
    }
    let max_distance = if lower.len() <= 4 { 1 } else { 2 };

    vocabulary
        .iter()
        .map(|v| (*v, damerau_levenshtein(&lower, v)))
        .filter(|(v, d)| *d <= max_distance && v.len() >= 3)
        .min_by_key(|(_, d)| *d)
        .map(|(v, _)| v)
}
