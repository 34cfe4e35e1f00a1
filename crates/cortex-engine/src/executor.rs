//! Tiered command execution with recovery.

use crate::memory::CommandMemory;
use crate::runtime::{ActionRuntime, BatchOutcome};
use crate::session::PageSession;
use crate::strategy::{
    CortexStrategy, DirectPatternStrategy, DomEngineStrategy, Strategy, StrategyContext,
};
use cortex_common::protocol::{ExecutableAction, ExecutionResult};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub const EXHAUSTED: &str = "All execution strategies failed";

/// Runs a natural-language command through the execution tiers in order, stopping at
/// the first that succeeds.
pub struct ResilientExecutor {
    runtime: Arc<ActionRuntime>,
    commands: Arc<CommandMemory>,
    strategies: Vec<Box<dyn Strategy>>,
}

impl ResilientExecutor {
    /// The standard tiers: cortex, dom_engine, direct_pattern.
    pub fn new(runtime: Arc<ActionRuntime>, commands: Arc<CommandMemory>) -> Self {
        let strategies: Vec<Box<dyn Strategy>> = vec![
            Box::new(CortexStrategy::new(runtime.clone(), commands.clone())),
            Box::new(DomEngineStrategy::new(runtime.clone())),
            Box::new(DirectPatternStrategy::new(runtime.clone())),
        ];
        Self {
            runtime,
            commands,
            strategies,
        }
    }

    /// Replace the tiers. Order is preserved.
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn Strategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn runtime(&self) -> &Arc<ActionRuntime> {
        &self.runtime
    }

    pub fn commands(&self) -> &Arc<CommandMemory> {
        &self.commands
    }

    pub async fn execute(
        &self,
        command: &str,
        session: &PageSession,
        persona: Option<&str>,
    ) -> ExecutionResult {
        let started = Instant::now();
        match self.runtime.page().url().await {
            Ok(url) => {
                session.sync_url(&url);
            }
            Err(e) => warn!(error = %e, "could not read page url"),
        }

        let ctx = StrategyContext { session, persona };
        let mut attempted = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            let kind = strategy.kind();
            attempted.push(kind);
            debug!(executor = %kind, command, "trying tier");

            match strategy.execute(command, &ctx).await {
                Ok(outcome) => {
                    if let Some(canonical) = &outcome.repair {
                        self.remember_repair(command, canonical, session).await;
                    }
                    info!(executor = %kind, command, "command executed");
                    return ExecutionResult {
                        ok: true,
                        executor: Some(kind),
                        result: outcome.result,
                        error: None,
                        duration_ms: elapsed_ms(started),
                        attempted,
                    };
                }
                Err(e) if e.is_terminal() => {
                    warn!(executor = %kind, command, error = %e, "command blocked");
                    return ExecutionResult {
                        ok: false,
                        executor: Some(kind),
                        result: Value::Null,
                        error: Some(e.to_string()),
                        duration_ms: elapsed_ms(started),
                        attempted,
                    };
                }
                Err(e) => {
                    warn!(executor = %kind, command, error = %e, "tier failed");
                }
            }
        }

        ExecutionResult {
            ok: false,
            executor: None,
            result: Value::Null,
            error: Some(EXHAUSTED.to_string()),
            duration_ms: elapsed_ms(started),
            attempted,
        }
    }

    /// Run pre-built actions front to back, stopping at the first failure.
    pub async fn execute_batch(
        &self,
        actions: &[ExecutableAction],
        session: &PageSession,
        persona: Option<&str>,
    ) -> BatchOutcome {
        self.runtime.execute_batch(actions, session, persona).await
    }

    async fn remember_repair(&self, command: &str, canonical: &str, session: &PageSession) {
        let Some(scope) = session.scope() else {
            return;
        };
        if let Err(e) = self.commands.learn(&scope, command, canonical, true).await {
            warn!(error = %e, "failed to store command memory");
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
