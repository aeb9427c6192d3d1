//! The lint backend.
//!
//! [`Linter`] is the seam: the server only needs "analyze this text, give
//! me findings". [`CommandLinter`] is the production backend; it runs an
//! ESLint-compatible executable with the document on stdin and parses the
//! JSON report it prints.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::thread;

use lintel_types::{DocumentUri, LintFinding};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::settings::LinterConfig;

/// Everything a backend needs to lint one document.
#[derive(Debug, Clone, Copy)]
pub struct LintRequest<'a> {
    pub uri: &'a DocumentUri,
    /// Filesystem path for `file://` documents.
    pub path: Option<&'a Path>,
    pub language_id: &'a str,
    pub text: &'a str,
    pub config: &'a LinterConfig,
}

/// Failure classes the server reports differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LintErrorKind {
    NoConfig,
    InvalidConfig,
    MissingModule,
    Unknown,
}

#[derive(Debug, Error)]
pub enum LintError {
    #[error("no lint configuration found: {0}")]
    NoConfig(String),
    #[error("lint configuration is invalid: {0}")]
    InvalidConfig(String),
    #[error("lint plugin or module is missing: {0}")]
    MissingModule(String),
    #[error("lint command `{command}` not found")]
    CommandNotFound {
        command: String,
        #[source]
        source: which::Error,
    },
    #[error("failed to run lint command `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("lint report is not valid JSON")]
    Report(#[source] serde_json::Error),
    #[error("lint failed: {0}")]
    Unknown(String),
}

impl LintError {
    #[must_use]
    pub fn kind(&self) -> LintErrorKind {
        match self {
            Self::NoConfig(_) => LintErrorKind::NoConfig,
            Self::InvalidConfig(_) => LintErrorKind::InvalidConfig,
            Self::MissingModule(_) => LintErrorKind::MissingModule,
            Self::CommandNotFound { .. }
            | Self::Spawn { .. }
            | Self::Report(_)
            | Self::Unknown(_) => LintErrorKind::Unknown,
        }
    }

    /// Classify a backend error message.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        classifier().classify(message)
    }
}

/// Synchronous lint backend. Implementations must not touch server state.
pub trait Linter: Send + Sync {
    fn lint(&self, request: &LintRequest<'_>) -> Result<Vec<LintFinding>, LintError>;
}

static CLASSIFIER: OnceLock<ErrorClassifier> = OnceLock::new();

fn classifier() -> &'static ErrorClassifier {
    CLASSIFIER.get_or_init(ErrorClassifier::new)
}

#[derive(Debug)]
struct ErrorClassifier {
    no_config: Regex,
    invalid_config: Regex,
    missing_module: Regex,
}

impl ErrorClassifier {
    fn new() -> Self {
        Self {
            no_config: Regex::new(
                r"(?i)(no eslint configuration found|could not find (?:a )?config(?:uration)? file|couldn't find a configuration file)",
            )
            .expect("valid no-config regex"),
            invalid_config: Regex::new(
                r"(?i)(configuration (?:in .+ )?is invalid|configuration for rule .+ is invalid|invalid (?:config|configuration))",
            )
            .expect("valid invalid-config regex"),
            missing_module: Regex::new(
                r"(?i)(failed to load (?:plugin|config|parser) .+|cannot find (?:module|package) '[^']+')",
            )
            .expect("valid missing-module regex"),
        }
    }

    fn classify(&self, message: &str) -> LintError {
        let message = message.trim();
        let first_line = message.lines().next().unwrap_or_default().to_string();
        if self.no_config.is_match(message) {
            LintError::NoConfig(first_line)
        } else if self.missing_module.is_match(message) {
            LintError::MissingModule(first_line)
        } else if self.invalid_config.is_match(message) {
            LintError::InvalidConfig(first_line)
        } else {
            LintError::Unknown(first_line)
        }
    }
}

/// One file entry of an ESLint `--format json` report.
#[derive(Debug, Deserialize)]
struct ReportEntry {
    #[serde(default)]
    messages: Vec<LintFinding>,
}

/// Parse a `--format json` report into the findings of its first entry.
pub fn parse_report(stdout: &str) -> Result<Vec<LintFinding>, serde_json::Error> {
    let entries: Vec<ReportEntry> = serde_json::from_str(stdout)?;
    Ok(entries
        .into_iter()
        .next()
        .map(|entry| entry.messages)
        .unwrap_or_default())
}

/// Runs the configured executable once per lint.
#[derive(Debug, Default)]
pub struct CommandLinter;

impl CommandLinter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn resolve(config: &LinterConfig) -> Result<PathBuf, LintError> {
        which::which(&config.command).map_err(|source| LintError::CommandNotFound {
            command: config.command.clone(),
            source,
        })
    }
}

impl Linter for CommandLinter {
    fn lint(&self, request: &LintRequest<'_>) -> Result<Vec<LintFinding>, LintError> {
        let config = request.config;
        let program = Self::resolve(config)?;
        let spawn_error = |source| LintError::Spawn {
            command: config.command.clone(),
            source,
        };

        let mut command = Command::new(&program);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(path) = request.path {
            command.arg("--stdin-filename").arg(path);
            if let Some(dir) = path.parent() {
                command.current_dir(dir);
            }
        }

        tracing::debug!(
            uri = %request.uri,
            language = request.language_id,
            program = %program.display(),
            "running lint command"
        );
        let mut child = command.spawn().map_err(spawn_error)?;

        // Feed stdin from a separate thread so a large report on stdout
        // cannot deadlock against an unread input pipe.
        let stdin = child.stdin.take();
        let text = request.text.to_string();
        let feeder = thread::spawn(move || {
            if let Some(mut stdin) = stdin {
                let _ = stdin.write_all(text.as_bytes());
            }
        });
        let output = child.wait_with_output().map_err(spawn_error)?;
        let _ = feeder.join();

        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Ok(findings) = parse_report(&stdout) {
            return Ok(findings);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            stdout.trim()
        } else {
            stderr.trim()
        };
        if message.is_empty() {
            return parse_report(&stdout).map_err(LintError::Report);
        }
        Err(LintError::classify(message))
    }
}
