//! Text normalization shared by the parser, the resolver and the memories.

/// Lowercase, split camelCase, turn every non-alphanumeric run into a single space.
///
/// `"firstName"` and `"first_name"` both become `"first name"`.
pub fn normalize_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_lower = false;
    let mut pending_space = false;

    for c in input.chars() {
        if c.is_alphanumeric() {
            if c.is_uppercase() && prev_lower {
                pending_space = true;
            }
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            for lc in c.to_lowercase() {
                out.push(lc);
            }
            prev_lower = c.is_lowercase() || c.is_numeric();
        } else {
            pending_space = true;
            prev_lower = false;
        }
    }

    out
}

/// Word tokens of `normalize_text(input)`.
pub fn tokenize(input: &str) -> Vec<String> {
    normalize_text(input)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lowercase and collapse whitespace without touching punctuation.
pub fn collapse_whitespace(input: &str) -> String {
    input
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}
