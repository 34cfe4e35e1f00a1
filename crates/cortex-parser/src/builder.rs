//! Turns a `ParsedCommand` into an execution-ready `ExecutableAction`.

use crate::parser::{ClickTarget, ParsedCommand, ParsedIntent, TypeValue};
use cortex_common::protocol::{
    ClickAction, ExecutableAction, Locator, NavigateAction, ScrollAction, TargetHints, TypeAction,
    WaitAction,
};
use cortex_common::text::tokenize;

pub fn build_action(cmd: &ParsedCommand) -> ExecutableAction {
    match &cmd.intent {
        ParsedIntent::Scroll {
            direction,
            amount,
            scroll_to,
            target,
        } => ExecutableAction::Scroll(ScrollAction {
            direction: *direction,
            amount: *amount,
            scroll_to: *scroll_to,
            target: target.clone(),
            locator: target.as_deref().map(locator_for).unwrap_or_default(),
        }),

        ParsedIntent::Click { target } => match target {
            ClickTarget::Named(t) => ExecutableAction::Click(ClickAction {
                target: Some(t.clone()),
                locator: locator_for(t),
                use_context: false,
            }),
            ClickTarget::Deictic(_) => ExecutableAction::Click(ClickAction {
                target: None,
                locator: Locator::default(),
                use_context: true,
            }),
        },

        ParsedIntent::Type { target, value } => {
            let (value, copy_from) = match value {
                TypeValue::Literal(v) | TypeValue::Bare(v) => (Some(v.clone()), None),
                TypeValue::CopyFrom(s) => (None, Some(s.clone())),
            };
            ExecutableAction::Type(TypeAction {
                target: target.clone(),
                locator: target.as_deref().map(locator_for).unwrap_or_default(),
                value,
                copy_from,
            })
        }

        ParsedIntent::Navigate { url } => {
            ExecutableAction::Navigate(NavigateAction { url: url.clone() })
        }

        ParsedIntent::Wait { duration_ms } => ExecutableAction::Wait(WaitAction {
            duration_ms: *duration_ms,
        }),
    }
}

/// Build a locator from a target phrase.
///
/// CSS-looking phrases become explicit selectors; everything else becomes heuristic
/// hints, with a snake_case guess for the `name` attribute.
pub fn locator_for(phrase: &str) -> Locator {
    if looks_like_selector(phrase) {
        return Locator {
            selectors: vec![phrase.to_string()],
            hints: TargetHints::default(),
        };
    }

    let tokens = tokenize(phrase);
    let name = (tokens.len() > 1).then(|| tokens.join("_"));

    Locator {
        selectors: Vec::new(),
        hints: TargetHints {
            field: Some(phrase.to_string()),
            name,
            label: Some(phrase.to_string()),
            placeholder: None,
        },
    }
}

fn looks_like_selector(phrase: &str) -> bool {
    let p = phrase.trim();
    if p.len() < 2 || p.contains(' ') {
        return false;
    }
    p.starts_with('#') || p.starts_with('.') || (p.contains('[') && p.ends_with(']'))
}
