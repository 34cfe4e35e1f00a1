//! Pattern-based command parser.
//!
//! Categories are tried in a fixed order (scroll, click, type, navigate, wait) and the
//! first matching pattern wins. A `None` result is not an error: it tells the caller to
//! try its recovery strategies.

use crate::normalizer::normalize;
use cortex_common::protocol::{
    Intent, PROFILE_SOURCE, ScrollAmount, ScrollDirection, ScrollOffset, ScrollTo,
};
use regex::{Captures, Regex};
use serde::Serialize;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedCommand {
    pub raw: String,
    pub intent: ParsedIntent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParsedIntent {
    Scroll {
        direction: Option<ScrollDirection>,
        amount: Option<ScrollAmount>,
        scroll_to: Option<ScrollTo>,
        target: Option<String>,
    },
    Click {
        target: ClickTarget,
    },
    Type {
        target: Option<String>,
        value: TypeValue,
    },
    Navigate {
        url: String,
    },
    Wait {
        duration_ms: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickTarget {
    Named(String),
    /// "this", "that", "here", "it": resolved from recent interaction.
    Deictic(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeValue {
    Literal(String),
    CopyFrom(String),
    /// No target given; typed into the focused or first usable field.
    Bare(String),
}

impl ParsedCommand {
    pub fn kind(&self) -> Intent {
        match self.intent {
            ParsedIntent::Scroll { .. } => Intent::Scroll,
            ParsedIntent::Click { .. } => Intent::Click,
            ParsedIntent::Type { .. } => Intent::Type,
            ParsedIntent::Navigate { .. } => Intent::Navigate,
            ParsedIntent::Wait { .. } => Intent::Wait,
        }
    }

    pub fn target(&self) -> Option<&str> {
        match &self.intent {
            ParsedIntent::Scroll { target, .. } | ParsedIntent::Type { target, .. } => {
                target.as_deref()
            }
            ParsedIntent::Click {
                target: ClickTarget::Named(t),
            } => Some(t),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match &self.intent {
            ParsedIntent::Type {
                value: TypeValue::Literal(v) | TypeValue::Bare(v),
                ..
            } => Some(v),
            ParsedIntent::Navigate { url } => Some(url),
            _ => None,
        }
    }

    pub fn copy_from(&self) -> Option<&str> {
        match &self.intent {
            ParsedIntent::Type {
                value: TypeValue::CopyFrom(s),
                ..
            } => Some(s),
            _ => None,
        }
    }

    pub fn use_context(&self) -> bool {
        matches!(
            self.intent,
            ParsedIntent::Click {
                target: ClickTarget::Deictic(_)
            }
        )
    }

    pub fn direction(&self) -> Option<ScrollDirection> {
        match self.intent {
            ParsedIntent::Scroll { direction, .. } => direction,
            _ => None,
        }
    }

    pub fn amount(&self) -> Option<ScrollAmount> {
        match self.intent {
            ParsedIntent::Scroll { amount, .. } => amount,
            _ => None,
        }
    }
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("command pattern is a valid regex")
}

// Scroll
static SCROLL_EDGE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)^(?:scroll|go|jump|move)\s+(?:all\s+the\s+way\s+)?(?:back\s+)?(?:up\s+|down\s+)?to\s+(?:the\s+)?(top|bottom|beginning|start|end)(?:\s+of\s+(?:the\s+)?page)?$")
});
static PAGE_KEY: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)^page\s+(up|down)$"));
static SCROLL_DIRECTION: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)^scroll(?:\s+(up|down|left|right))(?:\s+(.+))?$"));
static SCROLL_TO_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)^scroll\s+(?:to|until)\s+(?:the\s+)?(.+)$"));
static SCROLL_BARE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)^scroll$"));
static PIXELS: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)^(?:by\s+)?(\d+)\s*(?:px|pixels?)?$"));

// Click
static CLICK: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)^(?:click|tap|press|hit|select|choose)(?:\s+on)?(?:\s+(.+))?$")
});
static DEICTIC: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)^(this|that|here|it|there)(?:\s+(?:one|button|link|element|thing))?$")
});

// Type, most specific first
static FILL_FROM: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)^fill(?:\s+in)?\s+(.+?)\s+from\s+(.+)$"));
/// "fill X copy from Y" is left unparsed so the rewrite fold canonicalizes it.
static FILL_COPY_FROM: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)^fill(?:\s+in)?\s+.+?\s+copy\s+from\s+.+$"));
static COPY_INTO: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)^copy\s+(?:from\s+)?(.+?)\s+(?:into|to|in)\s+(.+)$"));
static WRITE_INTO: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)^(?:write|type|enter|put|input)\s+(.+?)\s+(?:into|in|on)\s+(.+)$")
});
static FILL_WITH: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)^(?:fill(?:\s+in)?|set|populate)\s+(.+?)\s+(?:with|to|as)\s+(.+)$")
});
static FILL_CONFIRMATION: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)^fill(?:\s+in)?\s+(.+?)\s+confirm(?:ation)?(?:\s+field)?$"));
static CONFIRM: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)^confirm\s+(?:the\s+|my\s+)?((?:\w+\s+)?(?:email|password|ssn|phone|pin|account\s+number))$")
});
static FILL_PROFILE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)^(?:fill(?:\s+in)?|autofill)\s+(.+)$"));
static TYPE_BARE: LazyLock<Regex> = LazyLock::new(|| re(r"(?i)^type\s+(.+)$"));

/// Fill targets that describe the whole form rather than one field.
static WHOLE_FORM: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)^(?:out\s+)?(?:the\s+|this\s+|my\s+)?(?:form|forms|all|all\s+fields|everything|fields|one\s+field.*|next\s+field|the\s+rest)$")
});

// Navigate
static NAVIGATE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)^(?:go\s+to|navigate\s+to|open|visit|browse\s+to|load)\s+(\S+)$")
});
static URL_LIKE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)^(?:https?://\S+|localhost(?::\d+)?(?:/\S*)?|[\w-]+(?:\.[\w-]+)+(?::\d+)?(?:/\S*)?)$"));

// Wait
static WAIT: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)^(?:wait|pause|sleep)(?:\s+for)?(?:\s+(\d+(?:\.\d+)?)\s*(ms|milliseconds?|s|secs?|seconds?)?)?$")
});

const DEFAULT_WAIT_MS: u64 = 1000;

/// Parse a free-text command. Returns `None` when no pattern matches.
pub fn parse(text: &str) -> Option<ParsedCommand> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return None;
    }

    let intent = parse_scroll(&normalized)
        .or_else(|| parse_click(&normalized))
        .or_else(|| parse_type(&normalized))
        .or_else(|| parse_navigate(&normalized))
        .or_else(|| parse_wait(&normalized))?;

    Some(ParsedCommand {
        raw: text.to_string(),
        intent,
    })
}

fn parse_scroll(s: &str) -> Option<ParsedIntent> {
    if let Some(c) = SCROLL_EDGE.captures(s) {
        let top = match c[1].to_lowercase().as_str() {
            "top" | "beginning" | "start" => ScrollOffset::Px(0),
            _ => ScrollOffset::MAX,
        };
        return Some(ParsedIntent::Scroll {
            direction: None,
            amount: None,
            scroll_to: Some(ScrollTo { top }),
            target: None,
        });
    }

    if let Some(c) = PAGE_KEY.captures(s) {
        return Some(ParsedIntent::Scroll {
            direction: Some(direction(&c[1])),
            amount: Some(ScrollAmount::Page),
            scroll_to: None,
            target: None,
        });
    }

    if let Some(c) = SCROLL_DIRECTION.captures(s) {
        let amount = c.get(2).and_then(|m| parse_amount(m.as_str()));
        return Some(ParsedIntent::Scroll {
            direction: Some(direction(&c[1])),
            amount,
            scroll_to: None,
            target: None,
        });
    }

    if let Some(c) = SCROLL_TO_ELEMENT.captures(s) {
        return Some(ParsedIntent::Scroll {
            direction: None,
            amount: None,
            scroll_to: None,
            target: Some(clean_phrase(&c[1])),
        });
    }

    if SCROLL_BARE.is_match(s) {
        return Some(ParsedIntent::Scroll {
            direction: Some(ScrollDirection::Down),
            amount: None,
            scroll_to: None,
            target: None,
        });
    }

    None
}

fn direction(word: &str) -> ScrollDirection {
    match word.to_lowercase().as_str() {
        "up" => ScrollDirection::Up,
        "left" => ScrollDirection::Left,
        "right" => ScrollDirection::Right,
        _ => ScrollDirection::Down,
    }
}

fn parse_amount(rest: &str) -> Option<ScrollAmount> {
    let rest = rest.trim().to_lowercase();
    if let Some(c) = PIXELS.captures(&rest) {
        return c[1].parse().ok().map(ScrollAmount::Pixels);
    }
    match rest.as_str() {
        "a bit" | "a little" | "slightly" | "a little bit" | "a tad" => Some(ScrollAmount::Small),
        "half a page" | "half page" | "half" | "by half a page" => Some(ScrollAmount::HalfPage),
        "a page" | "one page" | "page" | "a full page" | "by a page" => Some(ScrollAmount::Page),
        _ => None,
    }
}

fn parse_click(s: &str) -> Option<ParsedIntent> {
    let c = CLICK.captures(s)?;
    let target = match c.get(1) {
        None => ClickTarget::Deictic("here".to_string()),
        Some(m) => {
            let phrase = clean_phrase(m.as_str());
            match DEICTIC.captures(&phrase) {
                Some(d) => ClickTarget::Deictic(d[1].to_lowercase()),
                None if phrase.is_empty() => return None,
                None => ClickTarget::Named(phrase),
            }
        }
    };
    Some(ParsedIntent::Click { target })
}

fn parse_type(s: &str) -> Option<ParsedIntent> {
    let copy = |target: &str, source: &str| {
        let target = clean_phrase(target);
        let source = clean_phrase(source);
        (!target.is_empty() && !source.is_empty()).then(|| ParsedIntent::Type {
            target: Some(target),
            value: TypeValue::CopyFrom(source),
        })
    };
    let literal = |value: &str, target: &str| {
        let target = clean_phrase(target);
        let value = clean_value(value);
        (!target.is_empty()).then(|| ParsedIntent::Type {
            target: Some(target),
            value: TypeValue::Literal(value),
        })
    };

    if FILL_COPY_FROM.is_match(s) {
        return None;
    }
    if let Some(c) = FILL_FROM.captures(s) {
        return copy(&c[1], &c[2]);
    }
    if let Some(c) = COPY_INTO.captures(s) {
        return copy(&c[2], &c[1]);
    }
    if let Some(c) = WRITE_INTO.captures(s) {
        return literal(&c[1], &c[2]);
    }
    if let Some(c) = FILL_WITH.captures(s) {
        return literal(&c[2], &c[1]);
    }
    if let Some(c) = FILL_CONFIRMATION
        .captures(s)
        .or_else(|| CONFIRM.captures(s))
    {
        return confirmation(&c);
    }
    if let Some(c) = FILL_PROFILE.captures(s) {
        let target = clean_phrase(&c[1]);
        if WHOLE_FORM.is_match(&target) {
            return None;
        }
        return copy(&target, PROFILE_SOURCE);
    }
    if let Some(c) = TYPE_BARE.captures(s) {
        return Some(ParsedIntent::Type {
            target: None,
            value: TypeValue::Bare(clean_value(&c[1])),
        });
    }
    None
}

/// "fill ssn confirmation" / "confirm email": the confirmation field mirrors its source.
fn confirmation(c: &Captures<'_>) -> Option<ParsedIntent> {
    let source = clean_phrase(&c[1]);
    let source = source
        .strip_suffix(" confirmation")
        .map(str::to_string)
        .unwrap_or(source);
    if source.is_empty() {
        return None;
    }
    Some(ParsedIntent::Type {
        target: Some(format!("{} confirmation", source)),
        value: TypeValue::CopyFrom(source),
    })
}

fn parse_navigate(s: &str) -> Option<ParsedIntent> {
    let c = NAVIGATE.captures(s)?;
    let raw = c[1].trim_matches(|ch| ch == '"' || ch == '\'');
    if !URL_LIKE.is_match(raw) {
        return None;
    }
    let lower = raw.to_lowercase();
    let url = if lower.starts_with("http://") || lower.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };
    Some(ParsedIntent::Navigate { url })
}

fn parse_wait(s: &str) -> Option<ParsedIntent> {
    let c = WAIT.captures(s)?;
    let duration_ms = match c.get(1) {
        None => DEFAULT_WAIT_MS,
        Some(n) => {
            let n: f64 = n.as_str().parse().ok()?;
            let unit = c.get(2).map(|u| u.as_str().to_lowercase());
            match unit.as_deref() {
                Some(u) if u.starts_with("ms") || u.starts_with("milli") => n as u64,
                _ => (n * 1000.0) as u64,
            }
        }
    };
    Some(ParsedIntent::Wait { duration_ms })
}

/// Strip quotes, articles and filler from a target phrase.
pub(crate) fn clean_phrase(phrase: &str) -> String {
    let mut p = phrase.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    for prefix in ["on the ", "on ", "the ", "my "] {
        if p.len() > prefix.len()
            && p.get(..prefix.len()).is_some_and(|h| h.eq_ignore_ascii_case(prefix))
        {
            p = p[prefix.len()..].trim_start();
        }
    }
    for suffix in [" field", " box", " input"] {
        let cut = p.len().saturating_sub(suffix.len());
        if cut > 0 && p.get(cut..).is_some_and(|t| t.eq_ignore_ascii_case(suffix)) {
            p = p[..cut].trim_end();
        }
    }
    p.trim_matches(|c| c == '"' || c == '\'').to_string()
}

fn clean_value(value: &str) -> String {
    let v = value.trim();
    let quoted = v.len() >= 2
        && ((v.starts_with('"') && v.ends_with('"')) || (v.starts_with('\'') && v.ends_with('\'')));
    if quoted {
        v[1..v.len() - 1].to_string()
    } else {
        v.to_string()
    }
}
