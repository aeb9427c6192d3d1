//! Commands exposed through `workspace/executeCommand`, and the cache of
//! edits prepared for them.
//!
//! Code-action computation builds the workspace edit each offered command
//! would apply and parks it here, stamped with the document and version it
//! was computed from. Execution only ever applies an edit whose stamp
//! matches what the caller and the live document agree on.

use std::collections::HashMap;

use lintel_types::{DiagnosticKey, DocumentUri, DocumentVersion};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::WorkspaceEdit;

pub const APPLY_SINGLE_FIX: &str = "lintel.applySingleFix";
pub const APPLY_SAME_FIXES: &str = "lintel.applySameFixes";
pub const APPLY_ALL_FIXES: &str = "lintel.applyAllFixes";
pub const APPLY_DISABLE_LINE: &str = "lintel.applyDisableLine";
pub const APPLY_DISABLE_FILE: &str = "lintel.applyDisableFile";
/// Recomputes the overlap-free edit at execution time instead of using
/// the cache.
pub const APPLY_AUTO_FIX: &str = "lintel.applyAutoFix";

pub const ALL_COMMANDS: &[&str] = &[
    APPLY_SINGLE_FIX,
    APPLY_SAME_FIXES,
    APPLY_ALL_FIXES,
    APPLY_DISABLE_LINE,
    APPLY_DISABLE_FILE,
    APPLY_AUTO_FIX,
];

/// The single argument every lintel command takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandArgs {
    pub uri: DocumentUri,
    pub version: DocumentVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    /// Key of the diagnostic a per-problem command was offered for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl CommandArgs {
    pub fn new(uri: DocumentUri, version: DocumentVersion, rule_id: Option<&str>) -> Self {
        Self {
            uri,
            version,
            rule_id: rule_id.map(str::to_string),
            diagnostic: None,
        }
    }

    /// Scope the command to a single diagnostic.
    #[must_use]
    pub fn for_diagnostic(mut self, key: &DiagnosticKey) -> Self {
        self.diagnostic = Some(key.as_str().to_string());
        self
    }

    /// Parse the first element of an `executeCommand` argument list.
    pub fn from_arguments(arguments: &[Value]) -> Option<Self> {
        arguments
            .first()
            .and_then(|arg| Self::deserialize(arg).ok())
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Cache key of the edit `command` would apply with these arguments.
    #[must_use]
    pub fn cache_key(&self, command: &str) -> String {
        cache_key(command, self.rule_id.as_deref(), self.diagnostic.as_deref())
    }
}

/// The command id, then `:{rule}` for rule-scoped commands, then
/// `:{diagnostic key}` for commands offered on one diagnostic.
#[must_use]
pub fn cache_key(command: &str, rule_id: Option<&str>, diagnostic: Option<&str>) -> String {
    let mut key = command.to_string();
    for part in [rule_id, diagnostic].into_iter().flatten() {
        key.push(':');
        key.push_str(part);
    }
    key
}

/// Edits prepared by the most recent code-action computation.
#[derive(Debug, Default)]
pub struct CommandCache {
    stamp: Option<(DocumentUri, DocumentVersion)>,
    edits: HashMap<String, WorkspaceEdit>,
}

impl CommandCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every prepared edit and stamp the cache for a new document
    /// version.
    pub fn reset(&mut self, uri: &DocumentUri, version: DocumentVersion) {
        self.edits.clear();
        self.stamp = Some((uri.clone(), version));
    }

    pub fn clear(&mut self) {
        self.edits.clear();
        self.stamp = None;
    }

    pub fn insert(&mut self, key: String, edit: WorkspaceEdit) {
        self.edits.insert(key, edit);
    }

    /// Whether the cache was prepared for exactly this document version.
    #[must_use]
    pub fn is_usable(&self, uri: &DocumentUri, version: DocumentVersion) -> bool {
        self.stamp
            .as_ref()
            .is_some_and(|(stamped_uri, stamped_version)| {
                stamped_uri == uri && *stamped_version == version
            })
    }

    /// The prepared edit for `key`, if the cache matches `uri`/`version`.
    #[must_use]
    pub fn lookup(
        &self,
        uri: &DocumentUri,
        version: DocumentVersion,
        key: &str,
    ) -> Option<&WorkspaceEdit> {
        if !self.is_usable(uri, version) {
            return None;
        }
        self.edits.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}
