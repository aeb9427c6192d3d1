//! JSON-RPC envelopes and the LSP message shapes this server speaks.
//!
//! Only the fields lintel reads or writes are modelled; everything else in
//! a client payload is ignored by serde.

use std::fmt;
use std::path::PathBuf;

use lintel_types::{Diagnostic, DocumentUri, DocumentVersion, Range};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const JSONRPC_VERSION: &str = "2.0";

/// Code-action kind for single quick fixes and rule-wide fixes.
pub const KIND_QUICK_FIX: &str = "quickfix";
/// Generic fix-all kind clients request on save.
pub const KIND_SOURCE_FIX_ALL: &str = "source.fixAll";
/// lintel's own fix-all kind.
pub const KIND_SOURCE_FIX_ALL_LINTEL: &str = "source.fixAll.lintel";

/// Identifier of a client request; either form is legal on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// Standard JSON-RPC / LSP error codes.
pub mod error_codes {
    pub const INVALID_PARAMS: i64 = -32602;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const SERVER_NOT_INITIALIZED: i64 = -32002;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const REQUEST_CANCELLED: i64 = -32800;
}

/// Error half of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message} (code {code})")]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// The marker for superseded or explicitly cancelled work.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(error_codes::REQUEST_CANCELLED, "Request got cancelled")
    }

    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            error_codes::METHOD_NOT_FOUND,
            format!("Unhandled method {method}"),
        )
    }

    pub fn invalid_params(err: impl fmt::Display) -> Self {
        Self::new(error_codes::INVALID_PARAMS, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, err.to_string())
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.code == error_codes::REQUEST_CANCELLED
    }
}

/// Outcome of a request handler as delivered to the client.
pub type HandlerResult = Result<Value, ResponseError>;

/// A frame received from the client, classified.
#[derive(Debug)]
pub(crate) enum Incoming {
    /// Reply to a request this server sent (e.g. `workspace/applyEdit`).
    Response { id: Value, body: Value },
    Request {
        id: RequestId,
        method: String,
        params: Value,
    },
    Notification { method: String, params: Value },
}

pub(crate) fn parse_incoming(frame: &Value) -> Option<Incoming> {
    let id = frame.get("id").filter(|id| !id.is_null());
    let method = frame
        .get("method")
        .and_then(Value::as_str)
        .map(String::from);
    let params = frame.get("params").cloned().unwrap_or(Value::Null);
    let is_response = frame.get("result").is_some() || frame.get("error").is_some();

    match (id, method) {
        (Some(id), None) if is_response => Some(Incoming::Response {
            id: id.clone(),
            body: frame.clone(),
        }),
        (Some(id), Some(method)) => Some(Incoming::Request {
            id: serde_json::from_value(id.clone()).ok()?,
            method,
            params,
        }),
        (None, Some(method)) => Some(Incoming::Notification { method, params }),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Serialize)]
struct Notification<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
}

pub(crate) fn request_frame(id: u64, method: &str, params: Value) -> Value {
    serde_json::to_value(Request {
        jsonrpc: JSONRPC_VERSION,
        id,
        method,
        params,
    })
    .unwrap_or_default()
}

pub(crate) fn notification_frame(method: &str, params: Value) -> Value {
    serde_json::to_value(Notification {
        jsonrpc: JSONRPC_VERSION,
        method,
        params,
    })
    .unwrap_or_default()
}

pub(crate) fn response_frame(id: &RequestId, result: HandlerResult) -> Value {
    match result {
        Ok(value) => serde_json::json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": id,
            "result": value,
        }),
        Err(error) => serde_json::json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": id,
            "error": error,
        }),
    }
}

// ── Client → server params ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub initialization_options: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentItem {
    pub uri: DocumentUri,
    #[serde(default)]
    pub language_id: String,
    pub version: DocumentVersion,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDocumentIdentifier {
    pub uri: DocumentUri,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedTextDocumentIdentifier {
    pub uri: DocumentUri,
    pub version: DocumentVersion,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidOpenTextDocumentParams {
    pub text_document: TextDocumentItem,
}

/// A full-text replacement when `range` is absent, otherwise an
/// incremental edit.
#[derive(Debug, Clone, Deserialize)]
pub struct TextDocumentContentChangeEvent {
    #[serde(default)]
    pub range: Option<Range>,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidChangeTextDocumentParams {
    pub text_document: VersionedTextDocumentIdentifier,
    pub content_changes: Vec<TextDocumentContentChangeEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidSaveTextDocumentParams {
    pub text_document: TextDocumentIdentifier,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidCloseTextDocumentParams {
    pub text_document: TextDocumentIdentifier,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DidChangeConfigurationParams {
    #[serde(default)]
    pub settings: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelParams {
    pub id: RequestId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CodeActionContext {
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default)]
    pub only: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeActionParams {
    pub text_document: TextDocumentIdentifier,
    #[serde(default)]
    pub range: Range,
    #[serde(default)]
    pub context: CodeActionContext,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteCommandParams {
    pub command: String,
    #[serde(default)]
    pub arguments: Vec<Value>,
}

// ── Server → client payloads ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishDiagnosticsParams {
    pub uri: DocumentUri,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<DocumentVersion>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentEdit {
    pub text_document: VersionedTextDocumentIdentifier,
    pub edits: Vec<TextEdit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceEdit {
    pub document_changes: Vec<TextDocumentEdit>,
}

impl WorkspaceEdit {
    /// An edit touching a single versioned document.
    #[must_use]
    pub fn for_document(document: VersionedTextDocumentIdentifier, edits: Vec<TextEdit>) -> Self {
        Self {
            document_changes: vec![TextDocumentEdit {
                text_document: document,
                edits,
            }],
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.document_changes.iter().all(|c| c.edits.is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplyWorkspaceEditParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub edit: WorkspaceEdit,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyWorkspaceEditResult {
    #[serde(default)]
    pub applied: bool,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub title: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeAction {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Vec<Diagnostic>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit: Option<WorkspaceEdit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Command>,
}

/// `window/logMessage` / `window/showMessage` severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Error = 1,
    Warning = 2,
    Info = 3,
    Log = 4,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageParams {
    #[serde(rename = "type")]
    pub kind: u8,
    pub message: String,
}

impl MessageParams {
    pub fn new(kind: MessageType, message: impl Into<String>) -> Self {
        Self {
            kind: kind as u8,
            message: message.into(),
        }
    }
}

/// Result of `initialize`: full-text sync with open/close and save
/// notifications, code actions, and the commands the server executes.
pub(crate) fn initialize_result(commands: &[&str]) -> Value {
    serde_json::json!({
        "capabilities": {
            "textDocumentSync": {
                "openClose": true,
                "change": 2,
                "save": { "includeText": false }
            },
            "codeActionProvider": {
                "codeActionKinds": [KIND_QUICK_FIX, KIND_SOURCE_FIX_ALL_LINTEL]
            },
            "executeCommandProvider": {
                "commands": commands
            }
        },
        "serverInfo": {
            "name": "lintel",
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

/// Filesystem path for a `file://` URI, if it is one.
pub(crate) fn file_uri_to_path(uri: &DocumentUri) -> Option<PathBuf> {
    url::Url::parse(uri.as_str())
        .ok()
        .and_then(|u| u.to_file_path().ok())
}
