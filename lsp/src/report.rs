//! Turns backend failures into the status and messages the client sees.
//!
//! Configuration problems repeat on every keystroke until the user fixes
//! them, so each such kind is shown once per environment; the log still
//! gets every occurrence. Anything unclassified is shown every time.

use std::collections::HashSet;

use lintel_types::DocumentUri;
use serde::Serialize;

use crate::linter::{LintError, LintErrorKind};
use crate::protocol::{MessageParams, MessageType};

/// Payload of the `lintel/status` notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok = 1,
    Warn = 2,
    Error = 3,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusParams {
    pub state: u8,
}

impl From<Status> for StatusParams {
    fn from(status: Status) -> Self {
        Self {
            state: status as u8,
        }
    }
}

/// What to tell the client about one failed validation.
#[derive(Debug, Clone)]
pub struct Report {
    pub status: Status,
    pub log: MessageParams,
    /// Present when the failure should be surfaced to the user.
    pub show: Option<MessageParams>,
}

#[derive(Debug, Default)]
pub struct ErrorReporter {
    shown: HashSet<LintErrorKind>,
}

impl ErrorReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, uri: &DocumentUri, error: &LintError) -> Report {
        let kind = error.kind();
        let detail = format!("{uri}: {error}");
        let (status, show_type, summary) = match kind {
            LintErrorKind::NoConfig => (
                Status::Warn,
                MessageType::Warning,
                "No lint configuration found. Linting is disabled for files without one.",
            ),
            LintErrorKind::InvalidConfig => (
                Status::Warn,
                MessageType::Error,
                "The lint configuration is invalid. See the log for details.",
            ),
            LintErrorKind::MissingModule => (
                Status::Warn,
                MessageType::Error,
                "A lint plugin or module could not be loaded. See the log for details.",
            ),
            LintErrorKind::Unknown => (Status::Error, MessageType::Error, ""),
        };

        let show = match kind {
            LintErrorKind::Unknown => Some(MessageParams::new(show_type, detail.clone())),
            _ if self.shown.insert(kind) => Some(MessageParams::new(show_type, summary)),
            _ => None,
        };

        tracing::warn!(uri = %uri, kind = ?kind, error = %error, "validation failed");
        Report {
            status,
            log: MessageParams::new(MessageType::Error, detail),
            show,
        }
    }

    /// Configuration or watched files changed: report everything afresh.
    pub fn reset(&mut self) {
        self.shown.clear();
    }
}
