//! Turning an `ExecutableAction` into page mutations.
//!
//! Every mutation runs the same sequence: resolve, scroll into view, highlight,
//! settle, mutate, feedback, clear, humanized pause.

pub mod humanize;

pub use humanize::Humanizer;

use crate::config::{CortexConfig, RuntimeConfig, ScriptConfig};
use crate::memory::{Scope, SkillMemory};
use crate::page::{Overlay, Page, WriteMode};
use crate::profile::ProfileSource;
use crate::resolution::{
    Resolver, fingerprint, infer_field_kind, is_submit_control, is_usable, kind_for_phrase,
};
use crate::session::PageSession;
use cortex_common::dom::{DomSnapshot, NodeId};
use cortex_common::error::{PageError, StoreError};
use cortex_common::protocol::{
    ClickAction, ExecutableAction, Intent, Locator, NavigateAction, PROFILE_SOURCE,
    ScriptAction, ScrollAction, ScrollAmount, ScrollDirection, ScrollOffset, TypeAction,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Could not resolve {target} (tried {})", .attempted.join(", "))]
    Resolution {
        target: String,
        attempted: Vec<String>,
    },

    #[error("Source field '{source_field}' is empty")]
    SourceFieldEmpty { source_field: String },

    #[error("Profile has no value for {field}")]
    ProfileValueMissing { field: String },

    #[error("Profile unavailable: {0}")]
    Profile(#[from] StoreError),

    #[error("Submitting is turned off; not clicking {target}")]
    SubmitBlocked { target: String },

    #[error("Script timed out after {0}ms")]
    ScriptTimeout(u64),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error(transparent)]
    Page(#[from] PageError),
}

/// How the runtime found the element it acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedBy {
    Selector,
    Memory,
    Heuristic,
    Context,
    Focus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub intent: Intent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<ResolvedBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl ActionOutcome {
    fn new(intent: Intent) -> Self {
        Self {
            intent,
            element: None,
            resolved_by: None,
            value: None,
            source: None,
            result: None,
        }
    }

    fn on(mut self, element: NodeId, by: ResolvedBy) -> Self {
        self.element = Some(element);
        self.resolved_by = Some(by);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub ok: bool,
    pub completed: Vec<ActionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct Located {
    id: NodeId,
    by: ResolvedBy,
    snapshot: DomSnapshot,
}

pub struct ActionRuntime {
    page: Arc<dyn Page>,
    overlay: Arc<dyn Overlay>,
    profile: Arc<dyn ProfileSource>,
    skills: Option<Arc<SkillMemory>>,
    resolver: Resolver,
    config: RuntimeConfig,
    script: ScriptConfig,
    humanizer: Humanizer,
}

impl ActionRuntime {
    pub fn new(
        page: Arc<dyn Page>,
        overlay: Arc<dyn Overlay>,
        profile: Arc<dyn ProfileSource>,
        config: &CortexConfig,
    ) -> Self {
        Self {
            page,
            overlay,
            profile,
            skills: None,
            resolver: Resolver::new(&config.resolver),
            config: config.runtime.clone(),
            script: config.script.clone(),
            humanizer: Humanizer::new(&config.runtime),
        }
    }

    /// Consult and train skill memory when resolving click and type targets.
    pub fn with_skills(mut self, skills: Arc<SkillMemory>) -> Self {
        self.skills = Some(skills);
        self
    }

    pub fn page(&self) -> &Arc<dyn Page> {
        &self.page
    }

    pub fn overlay(&self) -> &Arc<dyn Overlay> {
        &self.overlay
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn profile(&self) -> &Arc<dyn ProfileSource> {
        &self.profile
    }

    pub async fn execute(
        &self,
        action: &ExecutableAction,
        session: &PageSession,
        persona: Option<&str>,
    ) -> Result<ActionOutcome, RuntimeError> {
        debug!(intent = action.intent().as_str(), "executing action");
        match action {
            ExecutableAction::Scroll(a) => self.scroll(a).await,
            ExecutableAction::Click(a) => self.click(a, session).await,
            ExecutableAction::Type(a) => self.type_text(a, session, persona).await,
            ExecutableAction::Navigate(a) => self.navigate(a, session).await,
            ExecutableAction::Wait(a) => {
                tokio::time::sleep(Duration::from_millis(a.duration_ms)).await;
                Ok(ActionOutcome::new(Intent::Wait))
            }
            ExecutableAction::Script(a) => self.run_script(a).await,
        }
    }

    /// Run actions front to back, stopping at the first failure.
    pub async fn execute_batch(
        &self,
        actions: &[ExecutableAction],
        session: &PageSession,
        persona: Option<&str>,
    ) -> BatchOutcome {
        let mut completed = Vec::with_capacity(actions.len());
        for (index, action) in actions.iter().enumerate() {
            match self.execute(action, session, persona).await {
                Ok(outcome) => completed.push(outcome),
                Err(e) => {
                    warn!(index, error = %e, "batch stopped");
                    return BatchOutcome {
                        ok: false,
                        completed,
                        failed_at: Some(index),
                        error: Some(e.to_string()),
                    };
                }
            }
        }
        BatchOutcome {
            ok: true,
            completed,
            failed_at: None,
            error: None,
        }
    }

    // ============================================================
    // Mutation primitives
    // ============================================================

    /// Click `id` with the full highlight/feedback sequence.
    pub async fn click_element(
        &self,
        id: NodeId,
        session: &PageSession,
    ) -> Result<(), RuntimeError> {
        self.prepare(id, "click", session).await?;
        let result = self.page.click(id).await;
        self.finish(id, result.is_ok()).await;
        result.map_err(RuntimeError::from)
    }

    /// Write `value` into `id` and fire `input` and `change`.
    pub async fn write_element(
        &self,
        id: NodeId,
        value: &str,
        session: &PageSession,
    ) -> Result<(), RuntimeError> {
        self.prepare(id, "type", session).await?;
        let result = self.write_and_notify(id, value).await;
        self.finish(id, result.is_ok()).await;
        result.map_err(RuntimeError::from)
    }

    async fn write_and_notify(&self, id: NodeId, value: &str) -> Result<(), PageError> {
        match self.page.write_value(id, value, WriteMode::NativeSetter).await {
            Err(PageError::NotSupported(reason)) => {
                debug!(element = id, reason = %reason, "native setter unavailable");
                self.page.write_value(id, value, WriteMode::Direct).await?;
            }
            other => other?,
        }
        self.page.dispatch_event(id, "input").await?;
        self.page.dispatch_event(id, "change").await
    }

    async fn prepare(
        &self,
        id: NodeId,
        label: &str,
        session: &PageSession,
    ) -> Result<(), PageError> {
        self.page.scroll_into_view(id).await?;
        if session.highlights_enabled() {
            self.overlay.highlight(id, label).await;
        }
        if self.config.settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;
        }
        Ok(())
    }

    async fn finish(&self, id: NodeId, success: bool) {
        self.overlay.feedback(id, success).await;
        self.overlay.clear().await;
        self.humanizer.pause().await;
    }

    // ============================================================
    // Target resolution
    // ============================================================

    async fn locate(
        &self,
        locator: &Locator,
        target: Option<&str>,
        intent: Intent,
        exclude: &HashSet<NodeId>,
    ) -> Result<Located, RuntimeError> {
        let mut snapshot = self.page.snapshot().await?;
        if let Some((id, by)) = self
            .resolve_once(locator, target, intent, &snapshot, exclude)
            .await?
        {
            return Ok(Located { id, by, snapshot });
        }

        let origin = (snapshot.viewport.scroll_x, snapshot.viewport.scroll_y);
        let step = snapshot.viewport.height * self.config.probe_scroll_ratio;
        for probe in 1..=self.config.probe_scrolls {
            debug!(probe, step, "probe scroll");
            self.page.scroll_by(0.0, step).await?;
            snapshot = self.page.snapshot().await?;
            if let Some((id, by)) = self
                .resolve_once(locator, target, intent, &snapshot, exclude)
                .await?
            {
                return Ok(Located { id, by, snapshot });
            }
        }

        self.page.scroll_to(origin.0, origin.1).await?;
        let described = target
            .map(str::to_string)
            .unwrap_or_else(|| locator.describe());
        warn!(wanted = %described, "target not resolved after probe scrolling");
        Err(RuntimeError::Resolution {
            target: described,
            attempted: attempted_for(locator, self.skills.is_some() && target.is_some()),
        })
    }

    async fn resolve_once(
        &self,
        locator: &Locator,
        target: Option<&str>,
        intent: Intent,
        snapshot: &DomSnapshot,
        exclude: &HashSet<NodeId>,
    ) -> Result<Option<(NodeId, ResolvedBy)>, RuntimeError> {
        let allowed = |id: &NodeId| {
            !exclude.contains(id) && snapshot.element(*id).is_some_and(is_usable)
        };

        for selector in &locator.selectors {
            match self.page.query_selector(selector).await {
                Ok(Some(id)) if allowed(&id) => return Ok(Some((id, ResolvedBy::Selector))),
                Ok(_) => {}
                Err(PageError::SelectorInvalid { selector }) => {
                    debug!(selector = %selector, "invalid selector, skipping");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
            // shadow roots and same-origin frames
            if let Ok(Some(id)) = self.resolver.query_selector(selector, snapshot)
                && allowed(&id)
            {
                return Ok(Some((id, ResolvedBy::Selector)));
            }
        }

        if let (Some(skills), Some(target), Some(scope)) =
            (&self.skills, target, Scope::from_url(&snapshot.url))
            && let Some(hit) = skills.find(&scope, intent, target, snapshot).await
            && allowed(&hit.element)
        {
            return Ok(Some((hit.element, ResolvedBy::Memory)));
        }

        Ok(self
            .resolver
            .find_element_by_heuristic(locator, intent, snapshot, exclude)
            .map(|id| (id, ResolvedBy::Heuristic)))
    }

    async fn remember(&self, target: Option<&str>, intent: Intent, located: &Located) {
        let (Some(skills), Some(target)) = (&self.skills, target) else {
            return;
        };
        let Some(scope) = Scope::from_url(&located.snapshot.url) else {
            return;
        };
        let Some(el) = located.snapshot.element(located.id) else {
            return;
        };
        if let Err(e) = skills.learn(&scope, intent, target, fingerprint(el)).await {
            warn!(error = %e, "failed to store skill memory");
        }
    }

    // ============================================================
    // Actions
    // ============================================================

    async fn click(
        &self,
        action: &ClickAction,
        session: &PageSession,
    ) -> Result<ActionOutcome, RuntimeError> {
        if action.use_context {
            let snapshot = self.page.snapshot().await?;
            let id = self.resolver.resolve_from_context(&snapshot).ok_or_else(|| {
                RuntimeError::Resolution {
                    target: "recent interaction".into(),
                    attempted: vec![
                        "last clicked".into(),
                        "last hovered".into(),
                        "cursor".into(),
                    ],
                }
            })?;
            guard_submit(&snapshot, id, "recent interaction", session)?;
            self.click_element(id, session).await?;
            return Ok(ActionOutcome::new(Intent::Click).on(id, ResolvedBy::Context));
        }

        let target = memory_target(action.target.as_deref(), &action.locator);
        let located = self
            .locate(&action.locator, target.as_deref(), Intent::Click, &HashSet::new())
            .await?;
        let described = target.clone().unwrap_or_else(|| action.locator.describe());
        guard_submit(&located.snapshot, located.id, &described, session)?;
        self.click_element(located.id, session).await?;
        self.remember(target.as_deref(), Intent::Click, &located).await;
        Ok(ActionOutcome::new(Intent::Click).on(located.id, located.by))
    }

    async fn type_text(
        &self,
        action: &TypeAction,
        session: &PageSession,
        persona: Option<&str>,
    ) -> Result<ActionOutcome, RuntimeError> {
        let target = memory_target(action.target.as_deref(), &action.locator);
        let located = if target.is_none() && action.locator.is_empty() {
            let snapshot = self.page.snapshot().await?;
            let id = self.resolver.typing_target(&snapshot).ok_or_else(|| {
                RuntimeError::Resolution {
                    target: "text field".into(),
                    attempted: vec!["focused element".into(), "first text field".into()],
                }
            })?;
            Located {
                id,
                by: ResolvedBy::Focus,
                snapshot,
            }
        } else {
            self.locate(&action.locator, target.as_deref(), Intent::Type, &HashSet::new())
                .await?
        };

        let mut outcome = ActionOutcome::new(Intent::Type).on(located.id, located.by);
        let value = match (action.copy_from.as_deref(), action.value.as_deref()) {
            (Some(PROFILE_SOURCE), _) => {
                self.profile_value(&located, target.as_deref(), persona)
                    .await?
            }
            (Some(source), _) => {
                let (source_id, value) = self.copy_value(source, located.id).await?;
                outcome.source = Some(source_id);
                value
            }
            (None, Some(value)) => value.to_string(),
            (None, None) => {
                return Err(RuntimeError::InvalidAction(
                    "type needs a value or a source field".into(),
                ));
            }
        };

        self.write_element(located.id, &value, session).await?;
        self.remember(target.as_deref(), Intent::Type, &located).await;
        outcome.value = Some(value);
        Ok(outcome)
    }

    async fn copy_value(
        &self,
        source: &str,
        target: NodeId,
    ) -> Result<(NodeId, String), RuntimeError> {
        let locator = cortex_parser::locator_for(source);
        let exclude = HashSet::from([target]);
        let located = self
            .locate(&locator, Some(source), Intent::Type, &exclude)
            .await?;
        let value = self
            .page
            .read_value(located.id)
            .await?
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| RuntimeError::SourceFieldEmpty {
                source_field: source.to_string(),
            })?;
        debug!(source, element = located.id, "copied source value");
        Ok((located.id, value))
    }

    async fn profile_value(
        &self,
        located: &Located,
        target: Option<&str>,
        persona: Option<&str>,
    ) -> Result<String, RuntimeError> {
        let kind = located
            .snapshot
            .element(located.id)
            .and_then(infer_field_kind)
            .or_else(|| target.and_then(kind_for_phrase))
            .ok_or_else(|| RuntimeError::ProfileValueMissing {
                field: target.unwrap_or("field").to_string(),
            })?;
        let profile = self.profile.profile(persona).await?;
        profile
            .value_for(kind)
            .ok_or_else(|| RuntimeError::ProfileValueMissing {
                field: kind.as_str().to_string(),
            })
    }

    async fn scroll(&self, action: &ScrollAction) -> Result<ActionOutcome, RuntimeError> {
        let outcome = ActionOutcome::new(Intent::Scroll);

        if let Some(to) = &action.scroll_to {
            let snapshot = self.page.snapshot().await?;
            let top = match to.top {
                ScrollOffset::Px(px) => px as f64,
                ScrollOffset::Keyword(_) => snapshot.viewport.max_scroll_y(),
            };
            self.page.scroll_to(snapshot.viewport.scroll_x, top).await?;
            return Ok(outcome);
        }

        let target = memory_target(action.target.as_deref(), &action.locator);
        if target.is_some() || !action.locator.is_empty() {
            let located = self
                .locate(&action.locator, target.as_deref(), Intent::Scroll, &HashSet::new())
                .await?;
            self.page.scroll_into_view(located.id).await?;
            return Ok(outcome.on(located.id, located.by));
        }

        let snapshot = self.page.snapshot().await?;
        let height = snapshot.viewport.height;
        let distance = match action.amount {
            Some(ScrollAmount::Pixels(px)) => px as f64,
            Some(ScrollAmount::Page) => height,
            Some(ScrollAmount::HalfPage) => height / 2.0,
            Some(ScrollAmount::Small) => self.config.small_scroll_px as f64,
            None => height * self.config.probe_scroll_ratio,
        };
        let (dx, dy) = match action.direction.unwrap_or(ScrollDirection::Down) {
            ScrollDirection::Down => (0.0, distance),
            ScrollDirection::Up => (0.0, -distance),
            ScrollDirection::Right => (distance, 0.0),
            ScrollDirection::Left => (-distance, 0.0),
        };
        self.page.scroll_by(dx, dy).await?;
        Ok(outcome)
    }

    async fn navigate(
        &self,
        action: &NavigateAction,
        session: &PageSession,
    ) -> Result<ActionOutcome, RuntimeError> {
        self.page.navigate(&action.url).await?;
        let url = self.page.url().await?;
        session.sync_url(&url);
        let mut outcome = ActionOutcome::new(Intent::Navigate);
        outcome.value = Some(url);
        Ok(outcome)
    }

    async fn run_script(&self, action: &ScriptAction) -> Result<ActionOutcome, RuntimeError> {
        let timeout_ms = action
            .timeout_ms
            .unwrap_or(self.script.default_timeout_ms)
            .min(self.script.max_timeout_ms);
        let budget = Duration::from_millis(timeout_ms);
        let evaluated = tokio::time::timeout(budget, self.page.evaluate(&action.code))
            .await
            .map_err(|_| RuntimeError::ScriptTimeout(timeout_ms))??;
        let mut outcome = ActionOutcome::new(Intent::Script);
        outcome.result = Some(evaluated);
        Ok(outcome)
    }
}

/// Refuse to click a submitting control while the page's no-submit guard is on.
fn guard_submit(
    snapshot: &DomSnapshot,
    id: NodeId,
    target: &str,
    session: &PageSession,
) -> Result<(), RuntimeError> {
    if session.no_submit() && snapshot.element(id).is_some_and(is_submit_control) {
        warn!(element = id, wanted = %target, "submit blocked");
        return Err(RuntimeError::SubmitBlocked {
            target: target.to_string(),
        });
    }
    Ok(())
}

/// Phrase used as the skill-memory target for an action.
fn memory_target(target: Option<&str>, locator: &Locator) -> Option<String> {
    target
        .or(locator.hints.field.as_deref())
        .or(locator.hints.label.as_deref())
        .or(locator.hints.name.as_deref())
        .or(locator.hints.placeholder.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn attempted_for(locator: &Locator, memory: bool) -> Vec<String> {
    let mut attempted: Vec<String> = locator
        .selectors
        .iter()
        .map(|s| format!("selector {}", s))
        .collect();
    if memory {
        attempted.push("skill memory".into());
    }
    if !locator.hints.is_empty() {
        attempted.push(format!("heuristic {}", locator.hints.describe()));
    }
    attempted.push("probe scrolling".into());
    attempted
}
