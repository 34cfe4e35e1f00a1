//! Per-page state shared by the execution tiers.

use crate::memory::Scope;
use crate::page::Overlay;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// State whose lifetime is one page: the step-by-step fill mode, the no-submit guard
/// and highlight cancellation. Reset when the page moves to a different scope.
#[derive(Debug, Default)]
pub struct PageSession {
    scope: Mutex<Option<Scope>>,
    step_mode: AtomicBool,
    no_submit: AtomicBool,
    highlights_cancelled: AtomicBool,
}

impl PageSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step_mode(&self) -> bool {
        self.step_mode.load(Ordering::SeqCst)
    }

    pub fn set_step_mode(&self, on: bool) {
        self.step_mode.store(on, Ordering::SeqCst);
    }

    pub fn no_submit(&self) -> bool {
        self.no_submit.load(Ordering::SeqCst)
    }

    pub fn set_no_submit(&self, on: bool) {
        self.no_submit.store(on, Ordering::SeqCst);
    }

    pub fn highlights_enabled(&self) -> bool {
        !self.highlights_cancelled.load(Ordering::SeqCst)
    }

    /// Clear the overlay and stop drawing new highlights. A mutation already in
    /// flight still completes.
    pub async fn cancel_highlight(&self, overlay: &dyn Overlay) {
        self.highlights_cancelled.store(true, Ordering::SeqCst);
        overlay.clear().await;
    }

    pub fn scope(&self) -> Option<Scope> {
        self.lock_scope().clone()
    }

    /// Track the page URL. Returns `true` when the scope changed and the session was
    /// reset.
    pub fn sync_url(&self, url: &str) -> bool {
        let next = Scope::from_url(url);
        let mut current = self.lock_scope();
        if *current == next {
            return false;
        }
        let had_scope = current.is_some();
        *current = next;
        drop(current);

        if had_scope {
            tracing::debug!(url, "page scope changed, resetting session");
        }
        self.reset();
        had_scope
    }

    pub fn reset(&self) {
        self.step_mode.store(false, Ordering::SeqCst);
        self.no_submit.store(false, Ordering::SeqCst);
        self.highlights_cancelled.store(false, Ordering::SeqCst);
    }

    fn lock_scope(&self) -> std::sync::MutexGuard<'_, Option<Scope>> {
        match self.scope.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
