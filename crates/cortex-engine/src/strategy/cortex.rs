//! First tier: parse the command, recovering through command memory and rewrites.

use super::{Strategy, StrategyContext, StrategyError, StrategyOutcome};
use crate::memory::CommandMemory;
use crate::runtime::{ActionRuntime, RuntimeError};
use async_trait::async_trait;
use cortex_common::protocol::{ExecutorKind, RecoveryPath};
use cortex_parser::{ParsedCommand, build_action, classify, normalize, parse, rewrite_candidates};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// A command the parser accepted, and how it got there.
#[derive(Debug, Clone, PartialEq)]
pub struct Understood {
    pub parsed: ParsedCommand,
    pub path: RecoveryPath,
    pub canonical: String,
}

impl Understood {
    pub fn repaired(&self) -> bool {
        self.path != RecoveryPath::Direct
    }
}

pub struct CortexStrategy {
    runtime: Arc<ActionRuntime>,
    commands: Arc<CommandMemory>,
}

impl CortexStrategy {
    pub fn new(runtime: Arc<ActionRuntime>, commands: Arc<CommandMemory>) -> Self {
        Self { runtime, commands }
    }

    /// Direct parse, then a remembered canonical form, then mechanical rewrites.
    pub async fn understand(&self, command: &str, ctx: &StrategyContext<'_>) -> Option<Understood> {
        if let Some(parsed) = parse(command) {
            return Some(Understood {
                parsed,
                path: RecoveryPath::Direct,
                canonical: normalize(command),
            });
        }

        if let Some(scope) = ctx.session.scope()
            && let Some(canonical) = self.commands.lookup(&scope, command).await
        {
            if let Some(parsed) = parse(&canonical) {
                debug!(command, canonical = %canonical, "recovered from command memory");
                return Some(Understood {
                    parsed,
                    path: RecoveryPath::Memory,
                    canonical,
                });
            }
            debug!(canonical = %canonical, "remembered command no longer parses");
        }

        rewrite_candidates(command).into_iter().find_map(|candidate| {
            let parsed = parse(&candidate)?;
            debug!(command, candidate = %candidate, "recovered by rewrite");
            Some(Understood {
                parsed,
                path: RecoveryPath::Rewrite,
                canonical: candidate,
            })
        })
    }
}

#[async_trait]
impl Strategy for CortexStrategy {
    fn kind(&self) -> ExecutorKind {
        ExecutorKind::Cortex
    }

    async fn execute(
        &self,
        command: &str,
        ctx: &StrategyContext<'_>,
    ) -> Result<StrategyOutcome, StrategyError> {
        let understood = self
            .understand(command, ctx)
            .await
            .ok_or_else(|| StrategyError::Unparsed(command.to_string()))?;

        let action = build_action(&understood.parsed);
        let outcome = self
            .runtime
            .execute(&action, ctx.session, ctx.persona)
            .await
            .map_err(|e| match e {
                RuntimeError::SubmitBlocked { .. } => StrategyError::Blocked(e.to_string()),
                e => e.into(),
            })?;

        let repaired = understood.repaired();
        Ok(StrategyOutcome {
            result: json!({
                "action": action,
                "recoveryPath": understood.path,
                "repaired": repaired,
                "canonicalCommand": understood.canonical,
                "outcome": outcome,
                "classification": classify(command),
            }),
            repair: repaired.then_some(understood.canonical),
        })
    }
}
