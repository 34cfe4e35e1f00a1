//! Execution tiers tried in order by the resilient executor.

pub mod cortex;
pub mod direct_pattern;
pub mod dom_engine;

pub use cortex::CortexStrategy;
pub use direct_pattern::DirectPatternStrategy;
pub use dom_engine::DomEngineStrategy;

pub use crate::resolution::{clickable_text, is_submit_control};

use crate::resolution::{Resolver, infer_field_kind};
use crate::runtime::RuntimeError;
use crate::session::PageSession;
use async_trait::async_trait;
use cortex_common::dom::{DomSnapshot, NodeId};
use cortex_common::error::{PageError, StoreError};
use cortex_common::protocol::{ExecutorKind, FieldKind, UserProfile};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("Command not understood: {0}")]
    Unparsed(String),

    #[error("Nothing to do: {0}")]
    NothingToDo(String),

    #[error("Blocked: {0}")]
    Blocked(String),

    #[error("Profile unavailable: {0}")]
    Profile(#[from] StoreError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Page(#[from] PageError),
}

impl StrategyError {
    /// A blocked action ends the command; later tiers must not retry it.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StrategyError::Blocked(_) | StrategyError::Runtime(RuntimeError::SubmitBlocked { .. })
        )
    }
}

/// Per-command inputs shared by every tier.
#[derive(Clone, Copy)]
pub struct StrategyContext<'a> {
    pub session: &'a PageSession,
    pub persona: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutcome {
    pub result: Value,
    /// Canonical command to remember when the tier had to repair the input.
    pub repair: Option<String>,
}

impl StrategyOutcome {
    pub fn new(result: Value) -> Self {
        Self {
            result,
            repair: None,
        }
    }
}

#[async_trait]
pub trait Strategy: Send + Sync {
    fn kind(&self) -> ExecutorKind;

    async fn execute(
        &self,
        command: &str,
        ctx: &StrategyContext<'_>,
    ) -> Result<StrategyOutcome, StrategyError>;
}

/// A field the profile can fill: its kind and the value to write.
#[derive(Debug, Clone, PartialEq)]
pub struct Fillable {
    pub id: NodeId,
    pub kind: FieldKind,
    pub value: String,
}

/// Empty text fields whose kind can be inferred and that the profile has a value for,
/// in document order.
pub fn fillable_fields(
    resolver: &Resolver,
    snapshot: &DomSnapshot,
    profile: &UserProfile,
) -> Vec<Fillable> {
    resolver
        .text_fields(snapshot)
        .into_iter()
        .filter(|e| e.value.as_deref().is_none_or(|v| v.trim().is_empty()))
        .filter_map(|e| {
            let kind = infer_field_kind(e)?;
            let value = profile.value_for(kind)?;
            Some(Fillable {
                id: e.id,
                kind,
                value,
            })
        })
        .collect()
}
