pub mod builder;
pub mod classifier;
pub mod normalizer;
pub mod parser;
pub mod rewrite;

pub use builder::{build_action, locator_for};
pub use classifier::{Classification, IntentCategory, classify};
pub use normalizer::{command_key, normalize};
pub use parser::{ClickTarget, ParsedCommand, ParsedIntent, TypeValue, parse};
pub use rewrite::rewrite_candidates;

use cortex_common::protocol::ExecutableAction;

/// Parse and build in one step.
pub fn parse_action(text: &str) -> Option<ExecutableAction> {
    parse(text).map(|cmd| build_action(&cmd))
}
