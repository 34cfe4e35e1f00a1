//! Last tier: literal command shapes, the step-by-step fill mode and the no-submit guard.

use super::{
    Fillable, Strategy, StrategyContext, StrategyError, StrategyOutcome, clickable_text,
    fillable_fields, is_submit_control,
};
use crate::runtime::ActionRuntime;
use async_trait::async_trait;
use cortex_common::dom::{DomElement, NodeId};
use cortex_common::protocol::ExecutorKind;
use cortex_common::text::normalize_text;
use regex::Regex;
use serde_json::json;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("direct pattern is a valid regex")
}

static NO_SUBMIT: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(?:(?:do\s+not|don'?t|never)\s+submit|without\s+submitting)\b")
});
static ALLOW_SUBMIT: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)^(?:allow|enable)\s+submit(?:s|ting|ssion)?$"));
static STEP_MODE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\b(?:one\s+(?:field\s+)?at\s+a\s+time|step\s+by\s+step)\b"));
static NEXT: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)^(?:next|next\s+(?:one|field)|continue|go\s+on)$"));
static STOP_STEP: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)^(?:stop|done|stop\s+stepping|exit\s+step\s+mode)$"));
static SUBMIT: LazyLock<Regex> = LazyLock::new(|| {
    re(concat!(
        r"(?i)^(?:(?:submit|send)(?:\s+(?:the\s+|this\s+)?form)?",
        r"|(?:click|press|hit)\s+(?:the\s+)?submit(?:\s+button)?)$"
    ))
});
static CLICK: LazyLock<Regex> = LazyLock::new(|| {
    re(r#"(?i)^(?:click|press|tap)(?:\s+on)?\s+(?:the\s+)?["']?(.+?)["']?(?:\s+(?:button|link))?$"#)
});
static TYPE_INTO: LazyLock<Regex> = LazyLock::new(|| {
    re(r#"(?i)^(?:type|enter|write)\s+["'](.+)["']\s+(?:into|in)\s+(?:the\s+)?(.+?)(?:\s+field)?$"#)
});
static FILL_WITH: LazyLock<Regex> = LazyLock::new(|| {
    re(r#"(?i)^fill\s+(?:the\s+)?(.+?)(?:\s+field)?\s+with\s+["']?(.+?)["']?$"#)
});

pub struct DirectPatternStrategy {
    runtime: Arc<ActionRuntime>,
}

impl DirectPatternStrategy {
    pub fn new(runtime: Arc<ActionRuntime>) -> Self {
        Self { runtime }
    }

    async fn next_fillable(
        &self,
        ctx: &StrategyContext<'_>,
    ) -> Result<Vec<Fillable>, StrategyError> {
        let snapshot = self.runtime.page().snapshot().await?;
        let profile = self.runtime.profile().profile(ctx.persona).await?;
        Ok(fillable_fields(self.runtime.resolver(), &snapshot, &profile))
    }

    /// Fill the first empty profile field and report how many remain.
    async fn step(&self, ctx: &StrategyContext<'_>) -> Result<StrategyOutcome, StrategyError> {
        let mut remaining = self.next_fillable(ctx).await?;
        if remaining.is_empty() {
            ctx.session.set_step_mode(false);
            info!("step mode finished");
            return Ok(StrategyOutcome::new(json!({
                "action": "fill_step",
                "done": true,
                "remaining": 0,
            })));
        }

        let field = remaining.remove(0);
        self.runtime
            .write_element(field.id, &field.value, ctx.session)
            .await?;
        Ok(StrategyOutcome::new(json!({
            "action": "fill_step",
            "element": field.id,
            "kind": field.kind,
            "done": remaining.is_empty(),
            "remaining": remaining.len(),
        })))
    }

    async fn submit(&self, ctx: &StrategyContext<'_>) -> Result<StrategyOutcome, StrategyError> {
        if ctx.session.no_submit() {
            return Err(StrategyError::Blocked(
                "submitting is turned off for this page".into(),
            ));
        }
        let snapshot = self.runtime.page().snapshot().await?;
        let id = self
            .runtime
            .resolver()
            .clickables(&snapshot)
            .into_iter()
            .find(|e| is_submit_control(e))
            .map(|e| e.id)
            .ok_or_else(|| StrategyError::NothingToDo("no submit control".into()))?;
        self.runtime.click_element(id, ctx.session).await?;
        Ok(StrategyOutcome::new(json!({ "action": "submit", "element": id })))
    }

    async fn click_literal(
        &self,
        label: &str,
        ctx: &StrategyContext<'_>,
    ) -> Result<StrategyOutcome, StrategyError> {
        let needle = normalize_text(label);
        let snapshot = self.runtime.page().snapshot().await?;
        let clickables = self.runtime.resolver().clickables(&snapshot);
        let found = clickables
            .iter()
            .find(|e| clickable_text(e).is_some_and(|t| t == needle))
            .or_else(|| {
                clickables
                    .iter()
                    .find(|e| clickable_text(e).is_some_and(|t| t.contains(&needle)))
            })
            .copied()
            .ok_or_else(|| StrategyError::NothingToDo(format!("nothing labelled '{}'", label)))?;

        if is_submit_control(found) && ctx.session.no_submit() {
            return Err(StrategyError::Blocked(
                "submitting is turned off for this page".into(),
            ));
        }
        let id = found.id;
        self.runtime.click_element(id, ctx.session).await?;
        Ok(StrategyOutcome::new(json!({ "action": "click", "element": id })))
    }

    async fn type_literal(
        &self,
        value: &str,
        field: &str,
        ctx: &StrategyContext<'_>,
    ) -> Result<StrategyOutcome, StrategyError> {
        let snapshot = self.runtime.page().snapshot().await?;
        let id = literal_field(self.runtime.resolver().text_fields(&snapshot), field)
            .ok_or_else(|| StrategyError::NothingToDo(format!("no field named '{}'", field)))?;
        self.runtime.write_element(id, value, ctx.session).await?;
        Ok(StrategyOutcome::new(json!({
            "action": "type",
            "element": id,
            "value": value,
        })))
    }
}

/// Text field whose name, id, placeholder, aria-label or label equals `field`, or failing
/// that contains it.
fn literal_field(fields: Vec<&DomElement>, field: &str) -> Option<NodeId> {
    let needle = normalize_text(field);
    if needle.is_empty() {
        return None;
    }
    let names = |e: &DomElement| -> Vec<String> {
        [
            e.attr("name"),
            e.attr("id"),
            e.attr("placeholder"),
            e.attr("aria-label"),
            e.label_text.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(normalize_text)
        .collect()
    };

    fields
        .iter()
        .find(|e| names(e).iter().any(|n| *n == needle))
        .or_else(|| {
            fields
                .iter()
                .find(|e| names(e).iter().any(|n| n.contains(&needle)))
        })
        .map(|e| e.id)
}

#[async_trait]
impl Strategy for DirectPatternStrategy {
    fn kind(&self) -> ExecutorKind {
        ExecutorKind::DirectPattern
    }

    async fn execute(
        &self,
        command: &str,
        ctx: &StrategyContext<'_>,
    ) -> Result<StrategyOutcome, StrategyError> {
        let command = command.split_whitespace().collect::<Vec<_>>().join(" ");
        let command = command.trim_end_matches(['.', '!']);

        if NO_SUBMIT.is_match(command) {
            ctx.session.set_no_submit(true);
            info!("no-submit guard on");
            // "one field at a time, don't submit" also starts stepping
            if STEP_MODE.is_match(command) {
                ctx.session.set_step_mode(true);
                return self.step(ctx).await;
            }
            return Ok(StrategyOutcome::new(json!({ "action": "guard", "noSubmit": true })));
        }
        if ALLOW_SUBMIT.is_match(command) {
            ctx.session.set_no_submit(false);
            info!("no-submit guard off");
            return Ok(StrategyOutcome::new(json!({ "action": "guard", "noSubmit": false })));
        }
        if STEP_MODE.is_match(command) {
            ctx.session.set_step_mode(true);
            info!("step mode on");
            return self.step(ctx).await;
        }
        if NEXT.is_match(command) {
            if !ctx.session.step_mode() {
                return Err(StrategyError::NothingToDo("step mode is off".into()));
            }
            return self.step(ctx).await;
        }
        if STOP_STEP.is_match(command) && ctx.session.step_mode() {
            ctx.session.set_step_mode(false);
            return Ok(StrategyOutcome::new(json!({ "action": "fill_step", "done": true })));
        }
        if SUBMIT.is_match(command) {
            return self.submit(ctx).await;
        }
        if let Some((value, field)) = TYPE_INTO
            .captures(command)
            .map(|c| (c[1].to_string(), c[2].to_string()))
        {
            return self.type_literal(&value, &field, ctx).await;
        }
        if let Some((field, value)) = FILL_WITH
            .captures(command)
            .map(|c| (c[1].to_string(), c[2].to_string()))
        {
            return self.type_literal(&value, &field, ctx).await;
        }
        if let Some(label) = CLICK.captures(command).map(|c| c[1].to_string()) {
            return self.click_literal(&label, ctx).await;
        }

        debug!(command, "no direct pattern matched");
        Err(StrategyError::NothingToDo(command.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_phrasings() {
        assert!(NO_SUBMIT.is_match("do not submit"));
        assert!(NO_SUBMIT.is_match("Don't submit the form"));
        assert!(NO_SUBMIT.is_match("fill everything without submitting"));
        assert!(NO_SUBMIT.is_match("fill one field at a time but don't submit"));
        assert!(!NO_SUBMIT.is_match("submit"));
        assert!(ALLOW_SUBMIT.is_match("allow submit"));
    }

    #[test]
    fn step_and_submit_phrasings() {
        assert!(STEP_MODE.is_match("fill one field at a time"));
        assert!(NEXT.is_match("next"));
        assert!(SUBMIT.is_match("submit the form"));
        assert!(SUBMIT.is_match("click the submit button"));
        assert!(!SUBMIT.is_match("submit later"));
    }
}
