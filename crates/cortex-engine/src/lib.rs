pub mod agent;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod executor;
pub mod formatter;
pub mod memory;
pub mod page;
pub mod profile;
pub mod resolution;
pub mod runtime;
pub mod session;
pub mod strategy;

pub use agent::Agent;
pub use cortex_common::{dom, protocol, text};
pub use executor::ResilientExecutor;
pub use session::PageSession;
