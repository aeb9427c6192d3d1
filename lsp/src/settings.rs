//! Client-supplied settings.
//!
//! Read from `initializationOptions` on startup and from the `lintel`
//! section of `workspace/didChangeConfiguration`. Every field has a
//! default, so partial or empty objects are accepted.

use serde::Deserialize;
use serde_json::Value;

/// Settings for one lintel session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Whether documents are linted at all. Default: true.
    pub validate: bool,
    /// When validation runs. Default: on every change.
    pub run: RunTrigger,
    /// Report errors only, dropping warnings. Default: false.
    pub quiet: bool,
    /// Offer `source.fixAll` actions. Default: true.
    pub auto_fix: bool,
    pub code_action: CodeActionSettings,
    pub linter: LinterConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            validate: true,
            run: RunTrigger::OnType,
            quiet: false,
            auto_fix: true,
            code_action: CodeActionSettings::default(),
            linter: LinterConfig::default(),
        }
    }
}

impl Settings {
    /// Parse a settings object. `null` yields the defaults.
    pub fn from_json(value: &Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Self::deserialize(value)
    }

    /// Settings from a `didChangeConfiguration` payload, which nests them
    /// under `lintel`. A payload without that section is `None`.
    pub fn from_configuration_change(settings: &Value) -> Option<Result<Self, serde_json::Error>> {
        settings.get("lintel").map(Self::from_json)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunTrigger {
    OnType,
    OnSave,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CodeActionSettings {
    pub disable_rule_comment: DisableRuleComment,
}

/// How "disable this rule" actions are offered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DisableRuleComment {
    pub enable: bool,
    pub location: CommentLocation,
    /// Directive prefix, e.g. `eslint` in `eslint-disable-line`.
    pub comment_prefix: String,
}

impl Default for DisableRuleComment {
    fn default() -> Self {
        Self {
            enable: true,
            location: CommentLocation::SeparateLine,
            comment_prefix: "eslint".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommentLocation {
    SeparateLine,
    SameLine,
}

/// The lint executable and its arguments.
///
/// The command must read source on stdin and print an ESLint-style JSON
/// report on stdout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LinterConfig {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for LinterConfig {
    fn default() -> Self {
        Self {
            command: "eslint".to_string(),
            args: vec![
                "--stdin".to_string(),
                "--format".to_string(),
                "json".to_string(),
            ],
        }
    }
}
