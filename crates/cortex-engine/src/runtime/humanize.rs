use crate::config::RuntimeConfig;
use rand::Rng;
use std::time::Duration;

/// Randomized pause after each mutation.
#[derive(Debug, Clone, Copy)]
pub struct Humanizer {
    enabled: bool,
    base_ms: u64,
    jitter_ms: u64,
}

impl Humanizer {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            enabled: config.humanize,
            base_ms: config.delay_base_ms,
            jitter_ms: config.delay_jitter_ms,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            base_ms: 0,
            jitter_ms: 0,
        }
    }

    /// `base + random(0..=jitter)`, or `None` when pacing is off.
    pub fn next_delay(&self) -> Option<Duration> {
        if !self.enabled {
            return None;
        }
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        };
        Some(Duration::from_millis(self.base_ms.saturating_add(jitter)))
    }

    pub async fn pause(&self) {
        if let Some(delay) = self.next_delay() {
            tokio::time::sleep(delay).await;
        }
    }
}
