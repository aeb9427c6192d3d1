//! Language server that bridges editors to a pluggable lint backend.

pub mod client;
pub mod code_actions;
pub mod codec;
pub mod commands;
pub mod correlation;
pub mod documents;
pub mod fixes;
pub mod handlers;
pub mod linter;
pub mod protocol;
pub mod queue;
pub mod report;
pub mod settings;

mod context;
mod server;

pub use context::ServerContext;
pub use correlation::{CorrelationStore, FixMap};
pub use fixes::{EmptyCollection, FixBatches, Fixes};
pub use linter::{CommandLinter, LintError, LintErrorKind, LintRequest, Linter, parse_report};
pub use server::Server;
pub use settings::Settings;
