use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CortexConfig {
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub script: ScriptConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_memory_enabled")]
    pub enabled: bool,
    #[serde(default = "default_max_entries")]
    pub skill_max_entries: usize,
    #[serde(default = "default_skill_ttl_days")]
    pub skill_ttl_days: u64,
    #[serde(default = "default_max_entries")]
    pub command_max_entries: usize,
    #[serde(default = "default_command_ttl_days")]
    pub command_ttl_days: u64,
    /// Skill entries scoring below this are never used.
    #[serde(default = "default_min_match_score")]
    pub min_match_score: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_memory_enabled(),
            skill_max_entries: default_max_entries(),
            skill_ttl_days: default_skill_ttl_days(),
            command_max_entries: default_max_entries(),
            command_ttl_days: default_command_ttl_days(),
            min_match_score: default_min_match_score(),
        }
    }
}

fn default_memory_enabled() -> bool {
    true
}

fn default_max_entries() -> usize {
    300
}

fn default_skill_ttl_days() -> u64 {
    45
}

fn default_command_ttl_days() -> u64 {
    60
}

fn default_min_match_score() -> u32 {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Pause a randomized interval after each mutation.
    #[serde(default = "default_humanize")]
    pub humanize: bool,
    #[serde(default = "default_delay_base_ms")]
    pub delay_base_ms: u64,
    #[serde(default = "default_delay_jitter_ms")]
    pub delay_jitter_ms: u64,
    #[serde(default = "default_probe_scrolls")]
    pub probe_scrolls: u32,
    /// Fraction of the viewport height scrolled per probe.
    #[serde(default = "default_probe_scroll_ratio")]
    pub probe_scroll_ratio: f64,
    /// Wait between highlighting an element and mutating it.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Pixels scrolled by "scroll down a bit".
    #[serde(default = "default_small_scroll_px")]
    pub small_scroll_px: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            humanize: default_humanize(),
            delay_base_ms: default_delay_base_ms(),
            delay_jitter_ms: default_delay_jitter_ms(),
            probe_scrolls: default_probe_scrolls(),
            probe_scroll_ratio: default_probe_scroll_ratio(),
            settle_ms: default_settle_ms(),
            small_scroll_px: default_small_scroll_px(),
        }
    }
}

impl RuntimeConfig {
    /// No pacing at all. Used by tests and batch tooling.
    pub fn immediate() -> Self {
        Self {
            humanize: false,
            settle_ms: 0,
            ..Self::default()
        }
    }
}

fn default_humanize() -> bool {
    true
}

fn default_delay_base_ms() -> u64 {
    220
}

fn default_delay_jitter_ms() -> u64 {
    260
}

fn default_probe_scrolls() -> u32 {
    4
}

fn default_probe_scroll_ratio() -> f64 {
    0.8
}

fn default_settle_ms() -> u64 {
    120
}

fn default_small_scroll_px() -> u32 {
    200
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Maximum number of document, shadow and frame roots a deep lookup visits.
    #[serde(default = "default_max_roots")]
    pub max_roots: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_roots: default_max_roots(),
        }
    }
}

fn default_max_roots() -> usize {
    80
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptConfig {
    #[serde(default = "default_script_timeout_ms")]
    pub default_timeout_ms: u64,
    #[serde(default = "default_script_max_timeout_ms")]
    pub max_timeout_ms: u64,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_script_timeout_ms(),
            max_timeout_ms: default_script_max_timeout_ms(),
        }
    }
}

fn default_script_timeout_ms() -> u64 {
    5000
}

fn default_script_max_timeout_ms() -> u64 {
    30000
}
