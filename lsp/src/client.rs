//! Handle for talking back to the client.
//!
//! Cloneable and detached from server state, so deferred handler work can
//! carry one into a spawned task. Everything funnels into the writer task;
//! outgoing requests park a oneshot in the pending map until the reader
//! routes the matching response back.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lintel_types::{Diagnostic, DocumentUri, DocumentVersion};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc, oneshot};

use crate::protocol::{
    self, ApplyWorkspaceEditParams, ApplyWorkspaceEditResult, HandlerResult, MessageParams,
    PublishDiagnosticsParams, RequestId, ResponseError, WorkspaceEdit,
};
use crate::report::{Status, StatusParams};

const REQUEST_TIMEOUT_SECS: u64 = 30;

pub const METHOD_STATUS: &str = "lintel/status";

pub(crate) enum WriterCommand {
    Send(Value),
    Shutdown,
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection to the client is closed")]
    Closed,
    #[error("client did not answer {method} in time")]
    Timeout { method: String },
    #[error("client answered {method} with an error: {error}")]
    Rejected {
        method: String,
        error: ResponseError,
    },
    #[error("malformed payload")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct ClientHandle {
    writer_tx: mpsc::UnboundedSender<WriterCommand>,
    next_id: Arc<AtomicU64>,
    pending: PendingMap,
}

impl ClientHandle {
    pub(crate) fn new(writer_tx: mpsc::UnboundedSender<WriterCommand>) -> Self {
        Self {
            writer_tx,
            next_id: Arc::new(AtomicU64::new(1)),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn send(&self, frame: Value) -> bool {
        self.writer_tx.send(WriterCommand::Send(frame)).is_ok()
    }

    pub fn notify(&self, method: &str, params: impl Serialize) {
        let params = serde_json::to_value(params).unwrap_or_default();
        if !self.send(protocol::notification_frame(method, params)) {
            tracing::debug!(method, "dropping notification, writer closed");
        }
    }

    pub(crate) fn respond(&self, id: &RequestId, result: HandlerResult) {
        if !self.send(protocol::response_frame(id, result)) {
            tracing::debug!(%id, "dropping response, writer closed");
        }
    }

    /// Send a request and wait for the client's answer.
    pub async fn request(&self, method: &str, params: impl Serialize) -> Result<Value, ClientError> {
        let params = serde_json::to_value(params)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if !self.send(protocol::request_frame(id, method, params)) {
            self.pending.lock().await.remove(&id);
            return Err(ClientError::Closed);
        }

        let body = match tokio::time::timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS), rx).await
        {
            Ok(Ok(body)) => body,
            Ok(Err(_)) => {
                self.pending.lock().await.remove(&id);
                return Err(ClientError::Closed);
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(ClientError::Timeout {
                    method: method.to_string(),
                });
            }
        };

        if let Some(error) = body.get("error") {
            let error = serde_json::from_value(error.clone())?;
            return Err(ClientError::Rejected {
                method: method.to_string(),
                error,
            });
        }
        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }

    /// Route a response frame to the request waiting on it.
    pub(crate) async fn resolve(&self, id: &Value, body: Value) {
        let Some(id) = id.as_u64() else {
            tracing::trace!(%id, "response with foreign id");
            return;
        };
        let sender = self.pending.lock().await.remove(&id);
        match sender {
            Some(tx) => {
                let _ = tx.send(body);
            }
            None => tracing::trace!(id, "response for unknown request"),
        }
    }

    pub async fn apply_edit(
        &self,
        label: Option<String>,
        edit: WorkspaceEdit,
    ) -> Result<ApplyWorkspaceEditResult, ClientError> {
        let result = self
            .request("workspace/applyEdit", ApplyWorkspaceEditParams { label, edit })
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    pub fn publish_diagnostics(
        &self,
        uri: &DocumentUri,
        version: Option<DocumentVersion>,
        diagnostics: Vec<Diagnostic>,
    ) {
        self.notify(
            "textDocument/publishDiagnostics",
            PublishDiagnosticsParams {
                uri: uri.clone(),
                version,
                diagnostics,
            },
        );
    }

    pub fn send_status(&self, status: Status) {
        self.notify(METHOD_STATUS, StatusParams::from(status));
    }

    pub fn log_message(&self, message: MessageParams) {
        self.notify("window/logMessage", message);
    }

    pub fn show_message(&self, message: MessageParams) {
        self.notify("window/showMessage", message);
    }

    pub(crate) fn shutdown(&self) {
        let _ = self.writer_tx.send(WriterCommand::Shutdown);
    }
}
