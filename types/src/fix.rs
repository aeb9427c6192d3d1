//! Auto-fixes recorded during a validation pass.

use serde::{Deserialize, Serialize};

use crate::ids::DocumentVersion;
use crate::position::OffsetRange;

/// Replace `range` with `text`. An empty range is a pure insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextReplacement {
    pub range: OffsetRange,
    #[serde(default)]
    pub text: String,
}

impl TextReplacement {
    #[must_use]
    pub fn new(range: OffsetRange, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }
}

/// A fix proposed by a lint rule, tied to the document version it was
/// computed against.
///
/// Fields are private; a fix is never edited after the validation pass
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoFix {
    label: String,
    document_version: DocumentVersion,
    rule_id: String,
    /// 0-indexed line the diagnostic starts on.
    line: u32,
    edit: TextReplacement,
}

impl AutoFix {
    #[must_use]
    pub fn new(
        rule_id: impl Into<String>,
        document_version: DocumentVersion,
        line: u32,
        edit: TextReplacement,
    ) -> Self {
        let rule_id = rule_id.into();
        Self {
            label: format!("Fix this {rule_id} problem"),
            document_version,
            rule_id,
            line,
            edit,
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn document_version(&self) -> DocumentVersion {
        self.document_version
    }

    #[must_use]
    pub fn rule_id(&self) -> &str {
        &self.rule_id
    }

    /// 0-indexed line the diagnostic starts on.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[must_use]
    pub fn edit(&self) -> &TextReplacement {
        &self.edit
    }

    #[must_use]
    pub fn range(&self) -> OffsetRange {
        self.edit.range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_names_the_rule() {
        let fix = AutoFix::new(
            "semi",
            DocumentVersion::new(3),
            0,
            TextReplacement::new(OffsetRange::new(10, 10), ";"),
        );
        assert_eq!(fix.label(), "Fix this semi problem");
        assert_eq!(fix.document_version(), DocumentVersion::new(3));
        assert_eq!(fix.range(), OffsetRange::new(10, 10));
    }

    #[test]
    fn test_replacement_text_defaults_to_deletion() {
        let edit: TextReplacement = serde_json::from_str(r#"{"range":[4,9]}"#).unwrap();
        assert_eq!(edit.text, "");
        assert_eq!(edit.range, OffsetRange::new(4, 9));
    }
}
