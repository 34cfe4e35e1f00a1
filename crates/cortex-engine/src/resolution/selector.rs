//! A small CSS selector matcher over snapshot elements.
//!
//! Supports type, `#id`, `.class` and attribute tests (`[a]`, `[a=v]`, `[a*=v]`,
//! `[a^=v]`, `[a$=v]`, `[a~=v]`), descendant and child combinators, and selector lists.

use cortex_common::dom::{DomElement, DomRoot};
use cortex_common::error::PageError;

#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq)]
struct Complex {
    compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`.
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

#[derive(Debug, Clone, PartialEq)]
struct AttrTest {
    name: String,
    op: AttrOp,
    value: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
    Prefix,
    Suffix,
    Word,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, PageError> {
        let invalid = || PageError::SelectorInvalid {
            selector: input.to_string(),
        };

        let mut alternatives = Vec::new();
        for part in split_list(input) {
            let part = part.trim();
            if part.is_empty() {
                return Err(invalid());
            }
            alternatives.push(parse_complex(part).ok_or_else(invalid)?);
        }
        if alternatives.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            source: input.to_string(),
            alternatives,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `element`, living in `root`, matches any alternative.
    pub fn matches(&self, element: &DomElement, root: &DomRoot) -> bool {
        self.alternatives.iter().any(|complex| {
            let last = complex.compounds.len() - 1;
            matches_from(complex, last, element, root)
        })
    }

    /// Words a heuristic search can use when the selector itself matches nothing:
    /// ids, classes and the values of identifying attributes.
    pub fn hint_tokens(&self) -> Vec<String> {
        let mut out = Vec::new();
        for complex in &self.alternatives {
            let Some(subject) = complex.compounds.last() else {
                continue;
            };
            out.extend(subject.id.iter().cloned());
            out.extend(subject.classes.iter().cloned());
            for attr in &subject.attrs {
                let identifying = matches!(
                    attr.name.as_str(),
                    "name" | "placeholder" | "aria-label" | "data-testid" | "id" | "title"
                );
                if identifying && attr.op != AttrOp::Exists {
                    out.push(attr.value.clone());
                }
            }
        }
        out
    }
}

fn matches_from(complex: &Complex, idx: usize, element: &DomElement, root: &DomRoot) -> bool {
    if !complex.compounds[idx].matches(element) {
        return false;
    }
    if idx == 0 {
        return true;
    }

    let parent_of = |el: &DomElement| {
        el.parent
            .and_then(|pid| root.elements.iter().find(|e| e.id == pid))
    };

    match complex.combinators[idx - 1] {
        Combinator::Child => {
            parent_of(element).is_some_and(|p| matches_from(complex, idx - 1, p, root))
        }
        Combinator::Descendant => {
            let mut current = parent_of(element);
            while let Some(ancestor) = current {
                if matches_from(complex, idx - 1, ancestor, root) {
                    return true;
                }
                current = parent_of(ancestor);
            }
            false
        }
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        *self == Compound::default()
    }

    fn matches(&self, el: &DomElement) -> bool {
        if let Some(tag) = &self.tag
            && tag != "*"
            && !el.tag.eq_ignore_ascii_case(tag)
        {
            return false;
        }
        if let Some(id) = &self.id
            && el.attr("id") != Some(id.as_str())
        {
            return false;
        }
        if !self.classes.is_empty() {
            let classes: Vec<&str> = el
                .attr("class")
                .map(|c| c.split_whitespace().collect())
                .unwrap_or_default();
            if !self.classes.iter().all(|c| classes.contains(&c.as_str())) {
                return false;
            }
        }
        self.attrs.iter().all(|test| {
            let Some(actual) = el.attributes.get(&test.name) else {
                return false;
            };
            match test.op {
                AttrOp::Exists => true,
                AttrOp::Equals => *actual == test.value,
                AttrOp::Contains => actual.contains(&test.value),
                AttrOp::Prefix => actual.starts_with(&test.value),
                AttrOp::Suffix => actual.ends_with(&test.value),
                AttrOp::Word => actual.split_whitespace().any(|w| w == test.value),
            }
        })
    }
}

/// Split a selector list on top-level commas.
fn split_list(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn parse_complex(input: &str) -> Option<Complex> {
    let chars: Vec<char> = input.chars().collect();
    let mut pos = 0;
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();

    loop {
        let compound = parse_compound(&chars, &mut pos)?;
        compounds.push(compound);

        let before = pos;
        while pos < chars.len() && chars[pos].is_whitespace() {
            pos += 1;
        }
        if pos >= chars.len() {
            break;
        }
        if chars[pos] == '>' {
            pos += 1;
            while pos < chars.len() && chars[pos].is_whitespace() {
                pos += 1;
            }
            combinators.push(Combinator::Child);
        } else if pos > before {
            combinators.push(Combinator::Descendant);
        } else {
            return None;
        }
    }

    Some(Complex {
        compounds,
        combinators,
    })
}

fn parse_compound(chars: &[char], pos: &mut usize) -> Option<Compound> {
    let mut compound = Compound::default();

    if *pos < chars.len() && (chars[*pos] == '*' || is_ident_char(chars[*pos])) {
        if chars[*pos] == '*' {
            *pos += 1;
            compound.tag = Some("*".to_string());
        } else {
            compound.tag = Some(read_ident(chars, pos)?.to_lowercase());
        }
    }

    while *pos < chars.len() {
        match chars[*pos] {
            '#' => {
                *pos += 1;
                compound.id = Some(read_ident(chars, pos)?);
            }
            '.' => {
                *pos += 1;
                compound.classes.push(read_ident(chars, pos)?);
            }
            '[' => {
                *pos += 1;
                compound.attrs.push(read_attr(chars, pos)?);
            }
            _ => break,
        }
    }

    (!compound.is_empty()).then_some(compound)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn read_ident(chars: &[char], pos: &mut usize) -> Option<String> {
    let start = *pos;
    while *pos < chars.len() && is_ident_char(chars[*pos]) {
        *pos += 1;
    }
    (*pos > start).then(|| chars[start..*pos].iter().collect())
}

/// Parse the inside of `[...]`; `pos` starts after the opening bracket.
fn read_attr(chars: &[char], pos: &mut usize) -> Option<AttrTest> {
    let skip_ws = |pos: &mut usize| {
        while *pos < chars.len() && chars[*pos].is_whitespace() {
            *pos += 1;
        }
    };

    skip_ws(pos);
    let name = read_ident(chars, pos)?.to_lowercase();
    skip_ws(pos);

    let op = match chars.get(*pos)? {
        ']' => {
            *pos += 1;
            return Some(AttrTest {
                name,
                op: AttrOp::Exists,
                value: String::new(),
            });
        }
        '=' => AttrOp::Equals,
        '*' => AttrOp::Contains,
        '^' => AttrOp::Prefix,
        '$' => AttrOp::Suffix,
        '~' => AttrOp::Word,
        _ => return None,
    };
    *pos += 1;
    if op != AttrOp::Equals {
        if chars.get(*pos) != Some(&'=') {
            return None;
        }
        *pos += 1;
    }
    skip_ws(pos);

    let value = match chars.get(*pos)? {
        q @ ('"' | '\'') => {
            let q = *q;
            *pos += 1;
            let start = *pos;
            while *pos < chars.len() && chars[*pos] != q {
                *pos += 1;
            }
            if *pos >= chars.len() {
                return None;
            }
            let v: String = chars[start..*pos].iter().collect();
            *pos += 1;
            v
        }
        _ => read_ident(chars, pos)?,
    };

    skip_ws(pos);
    if chars.get(*pos) != Some(&']') {
        return None;
    }
    *pos += 1;

    Some(AttrTest { name, op, value })
}
