//! Published diagnostics and the key that joins them back to their fixes.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::position::Range;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum DiagnosticSeverity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

#[derive(Debug, Error)]
#[error("unknown diagnostic severity {0}")]
pub struct UnknownSeverity(u8);

impl DiagnosticSeverity {
    /// Convert from the wire's numeric severity (1=Error, 2=Warning, 3=Info, 4=Hint).
    ///
    /// Returns `None` for values outside the defined range.
    #[must_use]
    pub fn from_lsp(value: u64) -> Option<Self> {
        match value {
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Information),
            4 => Some(Self::Hint),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "info",
            Self::Hint => "hint",
        }
    }
}

impl From<DiagnosticSeverity> for u8 {
    fn from(severity: DiagnosticSeverity) -> Self {
        severity as u8
    }
}

impl TryFrom<u8> for DiagnosticSeverity {
    type Error = UnknownSeverity;

    fn try_from(value: u8) -> Result<Self, UnknownSeverity> {
        Self::from_lsp(u64::from(value)).ok_or(UnknownSeverity(value))
    }
}

/// A diagnostic code as it travels on the wire: clients may echo it back
/// as either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiagnosticCode {
    Number(i64),
    String(String),
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for DiagnosticCode {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// A diagnostic in the shape the client receives (and sends back in
/// code-action contexts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub range: Range,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<DiagnosticSeverity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<DiagnosticCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn key(&self) -> DiagnosticKey {
        DiagnosticKey::compute(&self.range, self.code.as_ref())
    }
}

/// Join key between a published diagnostic and the fix recorded for it.
///
/// A pure function of the range and code: the diagnostic the client sends
/// back in a code-action request maps to the same key as the one that was
/// published. Never used for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiagnosticKey(String);

impl DiagnosticKey {
    #[must_use]
    pub fn compute(range: &Range, code: Option<&DiagnosticCode>) -> Self {
        let code = code.map(ToString::to_string).unwrap_or_default();
        Self(format!(
            "[{},{},{},{}]-{code}",
            range.start.line, range.start.character, range.end.line, range.end.character
        ))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DiagnosticKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
