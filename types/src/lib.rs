//! Core domain types for lintel.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the server: the wire protocol,
//! the fixes engine, and the linter collaborator all speak these types.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod diagnostic;
mod finding;
mod fix;
mod ids;
mod position;

pub use diagnostic::{Diagnostic, DiagnosticCode, DiagnosticKey, DiagnosticSeverity};
pub use finding::LintFinding;
pub use fix::{AutoFix, TextReplacement};
pub use ids::{DocumentUri, DocumentVersion};
pub use position::{OffsetRange, Position, Range};
