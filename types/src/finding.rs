//! Raw findings reported by the lint backend.

use serde::Deserialize;

use crate::diagnostic::{Diagnostic, DiagnosticCode, DiagnosticSeverity};
use crate::fix::{AutoFix, TextReplacement};
use crate::ids::DocumentVersion;
use crate::position::{Position, Range};

/// One problem reported by the lint backend.
///
/// Lines and columns are 1-based; `fix` offsets are absolute UTF-16
/// offsets into the linted text. Deserializes from an ESLint-style
/// `messages[]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintFinding {
    #[serde(default)]
    pub line: i64,
    #[serde(default)]
    pub column: i64,
    #[serde(default)]
    pub end_line: Option<i64>,
    #[serde(default)]
    pub end_column: Option<i64>,
    /// Backend severity: 1 = warning, 2 = error.
    #[serde(default)]
    pub severity: u64,
    #[serde(default)]
    pub rule_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub fix: Option<TextReplacement>,
}

fn zero_based(value: i64) -> u32 {
    u32::try_from(value.saturating_sub(1).max(0)).unwrap_or(u32::MAX)
}

impl LintFinding {
    /// Backend severity 1 maps to a warning; everything else is an error.
    #[must_use]
    pub fn diagnostic_severity(&self) -> DiagnosticSeverity {
        match self.severity {
            1 => DiagnosticSeverity::Warning,
            _ => DiagnosticSeverity::Error,
        }
    }

    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.diagnostic_severity() == DiagnosticSeverity::Warning
    }

    /// 0-indexed start position, negatives clamped to zero.
    #[must_use]
    pub fn start(&self) -> Position {
        Position::new(zero_based(self.line), zero_based(self.column))
    }

    /// 0-indexed end position; a missing end collapses onto the start.
    #[must_use]
    pub fn end(&self) -> Position {
        let start = self.start();
        Position::new(
            self.end_line.map_or(start.line, zero_based),
            self.end_column.map_or(start.character, zero_based),
        )
    }

    /// Normalize into the diagnostic published to the client.
    #[must_use]
    pub fn to_diagnostic(&self, source: &str) -> Diagnostic {
        let message = match &self.rule_id {
            Some(rule) => format!("{} ({rule})", self.message),
            None => self.message.clone(),
        };
        Diagnostic {
            range: Range::new(self.start(), self.end()),
            severity: Some(self.diagnostic_severity()),
            code: self.rule_id.as_deref().map(DiagnosticCode::from),
            source: Some(source.to_string()),
            message,
        }
    }

    /// The proposed fix, when the finding names a rule and carries one.
    #[must_use]
    pub fn to_auto_fix(&self, version: DocumentVersion) -> Option<AutoFix> {
        let rule = self.rule_id.as_deref()?;
        let fix = self.fix.clone()?;
        Some(AutoFix::new(rule, version, self.start().line, fix))
    }
}
