//! Second tier: map intents straight onto the document.
//!
//! Independent of the command grammar. Fill commands go through field-kind inference and the
//! user profile; click-like commands are matched against clickable text by similarity.

use super::{
    Strategy, StrategyContext, StrategyError, StrategyOutcome, clickable_text, fillable_fields,
    is_submit_control,
};
use crate::resolution::{infer_field_kind, kind_for_phrase};
use crate::runtime::{ActionRuntime, RuntimeError};
use async_trait::async_trait;
use cortex_common::dom::NodeId;
use cortex_common::protocol::ExecutorKind;
use cortex_common::text::normalize_text;
use cortex_parser::{IntentCategory, classify, normalize};
use regex::Regex;
use serde_json::json;
use std::sync::{Arc, LazyLock};
use tracing::debug;

static FILL_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:fill|complete|autofill)(?:\s+(?:out|in))?\s+(?:the\s+|this\s+|my\s+)?(?:form|all(?:\s+fields)?|everything|fields)(?:\s+(?:with|from|using)\s+(?:my\s+)?(?:profile|info|details))?$",
    )
    .expect("valid fill-form regex")
});
static FILL_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:fill|autofill|enter|put)(?:\s+in)?\s+(?:the\s+|my\s+)?(.+?)(?:\s+field)?$",
    )
    .expect("valid fill-field regex")
});
static CLICK_VERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:click|press|tap|hit|select|choose)(?:\s+on)?\s+(?:the\s+)?(.+?)(?:\s+(?:button|link))?$",
    )
    .expect("valid click regex")
});
static NEGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:don'?t|do\s+not|never|without|stop|allow)\b")
        .expect("valid negation regex")
});

/// Minimum similarity for a click target named with an explicit verb.
const VERB_MATCH: f64 = 0.6;
/// Minimum similarity for a bare phrase such as "submit".
const BARE_MATCH: f64 = 0.75;
/// Similarity granted when one text contains the other.
const CONTAINS_MATCH: f64 = 0.8;
const BARE_MAX_WORDS: usize = 2;

pub struct DomEngineStrategy {
    runtime: Arc<ActionRuntime>,
}

impl DomEngineStrategy {
    pub fn new(runtime: Arc<ActionRuntime>) -> Self {
        Self { runtime }
    }

    async fn fill_form(&self, ctx: &StrategyContext<'_>) -> Result<StrategyOutcome, StrategyError> {
        let snapshot = self.runtime.page().snapshot().await?;
        let profile = self.runtime.profile().profile(ctx.persona).await?;
        let fields = fillable_fields(self.runtime.resolver(), &snapshot, &profile);
        if fields.is_empty() {
            return Err(StrategyError::NothingToDo(
                "no empty field matches the profile".into(),
            ));
        }

        let mut filled = Vec::with_capacity(fields.len());
        for field in fields {
            self.runtime
                .write_element(field.id, &field.value, ctx.session)
                .await?;
            filled.push(json!({ "element": field.id, "kind": field.kind }));
        }
        debug!(count = filled.len(), "filled form from profile");
        Ok(StrategyOutcome::new(json!({
            "action": "fill_form",
            "filled": filled,
        })))
    }

    async fn fill_field(
        &self,
        phrase: &str,
        ctx: &StrategyContext<'_>,
    ) -> Result<StrategyOutcome, StrategyError> {
        let kind = kind_for_phrase(phrase)
            .ok_or_else(|| StrategyError::NothingToDo(format!("unknown field '{}'", phrase)))?;

        let snapshot = self.runtime.page().snapshot().await?;
        let candidates: Vec<_> = self
            .runtime
            .resolver()
            .text_fields(&snapshot)
            .into_iter()
            .filter(|e| infer_field_kind(e) == Some(kind))
            .collect();
        // an empty field of the right kind beats one that is already filled
        let target = candidates
            .iter()
            .find(|e| e.value.as_deref().is_none_or(|v| v.trim().is_empty()))
            .or(candidates.first())
            .map(|e| e.id)
            .ok_or_else(|| StrategyError::NothingToDo(format!("no {} field", kind.as_str())))?;

        let profile = self.runtime.profile().profile(ctx.persona).await?;
        let value = profile
            .value_for(kind)
            .ok_or_else(|| RuntimeError::ProfileValueMissing {
                field: kind.as_str().to_string(),
            })?;

        self.runtime.write_element(target, &value, ctx.session).await?;
        Ok(StrategyOutcome::new(json!({
            "action": "fill_field",
            "element": target,
            "kind": kind,
        })))
    }

    async fn click_text(
        &self,
        phrase: &str,
        explicit: bool,
        ctx: &StrategyContext<'_>,
    ) -> Result<StrategyOutcome, StrategyError> {
        let needle = normalize_text(phrase);
        if needle.is_empty() {
            return Err(StrategyError::NothingToDo("empty click target".into()));
        }
        let threshold = if explicit { VERB_MATCH } else { BARE_MATCH };

        let snapshot = self.runtime.page().snapshot().await?;
        let mut best: Option<(NodeId, f64, bool)> = None;
        for el in self.runtime.resolver().clickables(&snapshot) {
            let Some(text) = clickable_text(el) else {
                continue;
            };
            let score = similarity(&needle, &text, explicit);
            if score >= threshold && best.is_none_or(|(_, b, _)| score > b) {
                best = Some((el.id, score, is_submit_control(el)));
            }
        }

        let (id, score, submits) = best.ok_or_else(|| {
            StrategyError::NothingToDo(format!("no clickable text like '{}'", phrase))
        })?;
        if submits && ctx.session.no_submit() {
            return Err(StrategyError::Blocked("submitting is turned off".into()));
        }

        debug!(element = id, score, "clickable text match");
        self.runtime.click_element(id, ctx.session).await?;
        Ok(StrategyOutcome::new(json!({
            "action": "click",
            "element": id,
            "similarity": score,
        })))
    }

    async fn try_fill(
        &self,
        command: &str,
        ctx: &StrategyContext<'_>,
    ) -> Option<Result<StrategyOutcome, StrategyError>> {
        if FILL_FORM.is_match(command) {
            return Some(self.fill_form(ctx).await);
        }
        let phrase = FILL_FIELD.captures(command)?.get(1)?.as_str().to_string();
        Some(self.fill_field(&phrase, ctx).await)
    }

    async fn try_click(
        &self,
        command: &str,
        ctx: &StrategyContext<'_>,
    ) -> Option<Result<StrategyOutcome, StrategyError>> {
        if let Some(phrase) = CLICK_VERB.captures(command).map(|c| c[1].to_string()) {
            return Some(self.click_text(&phrase, true, ctx).await);
        }
        let bare = command.split_whitespace().count() <= BARE_MAX_WORDS;
        if bare && classify(command).category == IntentCategory::Interaction {
            return Some(self.click_text(command, false, ctx).await);
        }
        None
    }
}

/// Normalized edit similarity, raised to `CONTAINS_MATCH` for containment when the
/// user named the action explicitly.
fn similarity(needle: &str, text: &str, explicit: bool) -> f64 {
    let score = strsim::normalized_levenshtein(needle, text);
    if explicit && (text.contains(needle) || needle.contains(text)) {
        score.max(CONTAINS_MATCH)
    } else {
        score
    }
}

#[async_trait]
impl Strategy for DomEngineStrategy {
    fn kind(&self) -> ExecutorKind {
        ExecutorKind::DomEngine
    }

    async fn execute(
        &self,
        command: &str,
        ctx: &StrategyContext<'_>,
    ) -> Result<StrategyOutcome, StrategyError> {
        let command = normalize(command);
        if NEGATION.is_match(&command) {
            return Err(StrategyError::NothingToDo("negated command".into()));
        }

        // the classifier only breaks ties between the fill and click readings
        let fill_first = classify(&command).category == IntentCategory::FormFill;
        let attempt = if fill_first {
            match self.try_fill(&command, ctx).await {
                Some(result) => Some(result),
                None => self.try_click(&command, ctx).await,
            }
        } else {
            match self.try_click(&command, ctx).await {
                Some(result) => Some(result),
                None => self.try_fill(&command, ctx).await,
            }
        };

        attempt.unwrap_or_else(|| Err(StrategyError::NothingToDo(command)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn similarity_prefers_exact_text() {
        assert_eq!(similarity("submit", "submit", false), 1.0);
        assert!(similarity("allow submit", "submit", false) < BARE_MATCH);
        assert!(similarity("sign", "sign in", true) >= VERB_MATCH);
    }

    #[test]
    fn fill_form_phrasings() {
        for cmd in ["fill form", "fill out the form", "autofill everything", "fill all fields"] {
            assert!(FILL_FORM.is_match(cmd), "{cmd}");
        }
        assert!(!FILL_FORM.is_match("fill one field at a time"));
    }
}
