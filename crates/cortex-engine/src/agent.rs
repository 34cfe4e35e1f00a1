//! One page, its session, and everything wired up to act on it.

use crate::config::CortexConfig;
use crate::executor::ResilientExecutor;
use crate::memory::{CommandMemory, InMemoryStore, KeyValueStore, SkillMemory};
use crate::page::{Overlay, Page};
use crate::profile::{ProfileSource, StoreProfileSource};
use crate::resolution::Resolver;
use crate::runtime::{ActionOutcome, ActionRuntime, BatchOutcome, RuntimeError};
use crate::session::PageSession;
use cortex_common::protocol::{ExecutableAction, ExecutionResult};
use std::sync::Arc;
use tracing::warn;

pub struct Agent {
    executor: ResilientExecutor,
    session: PageSession,
    skills: Arc<SkillMemory>,
}

impl Agent {
    /// Memories and the user profile live in `store`. With memory disabled the
    /// memories are kept in process only.
    pub fn new(
        page: Arc<dyn Page>,
        store: Arc<dyn KeyValueStore>,
        overlay: Arc<dyn Overlay>,
        config: &CortexConfig,
    ) -> Self {
        let profile: Arc<dyn ProfileSource> = Arc::new(StoreProfileSource::new(store.clone()));
        Self::with_profile(page, store, overlay, profile, config)
    }

    pub fn with_profile(
        page: Arc<dyn Page>,
        store: Arc<dyn KeyValueStore>,
        overlay: Arc<dyn Overlay>,
        profile: Arc<dyn ProfileSource>,
        config: &CortexConfig,
    ) -> Self {
        let memory_store: Arc<dyn KeyValueStore> = if config.memory.enabled {
            store
        } else {
            Arc::new(InMemoryStore::new())
        };
        let skills = Arc::new(SkillMemory::new(
            memory_store.clone(),
            &config.memory,
            Resolver::new(&config.resolver),
        ));
        let commands = Arc::new(CommandMemory::new(memory_store, &config.memory));

        let runtime = Arc::new(
            ActionRuntime::new(page, overlay, profile, config).with_skills(skills.clone()),
        );
        Self {
            executor: ResilientExecutor::new(runtime, commands),
            session: PageSession::new(),
            skills,
        }
    }

    pub fn session(&self) -> &PageSession {
        &self.session
    }

    pub fn executor(&self) -> &ResilientExecutor {
        &self.executor
    }

    pub fn skills(&self) -> &Arc<SkillMemory> {
        &self.skills
    }

    /// Execute a natural-language command through every tier.
    pub async fn run(&self, command: &str, persona: Option<&str>) -> ExecutionResult {
        self.executor.execute(command, &self.session, persona).await
    }

    /// Execute one pre-built action, bypassing the tiers.
    pub async fn run_action(
        &self,
        action: &ExecutableAction,
        persona: Option<&str>,
    ) -> Result<ActionOutcome, RuntimeError> {
        self.sync_url().await;
        self.executor
            .runtime()
            .execute(action, &self.session, persona)
            .await
    }

    pub async fn run_batch(
        &self,
        actions: &[ExecutableAction],
        persona: Option<&str>,
    ) -> BatchOutcome {
        self.sync_url().await;
        self.executor
            .execute_batch(actions, &self.session, persona)
            .await
    }

    pub async fn cancel_highlight(&self) {
        let overlay = self.executor.runtime().overlay().clone();
        self.session.cancel_highlight(overlay.as_ref()).await;
    }

    async fn sync_url(&self) {
        match self.executor.runtime().page().url().await {
            Ok(url) => {
                self.session.sync_url(&url);
            }
            Err(e) => warn!(error = %e, "could not read page url"),
        }
    }
}
