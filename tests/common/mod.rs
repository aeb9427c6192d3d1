//! Shared test utilities and fixtures
//!
//! An in-process server wired to a scripted linter, driven over an in-memory
//! duplex stream with the same framing a real editor uses.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use lintel_lsp::codec::{FrameReader, FrameWriter};
use lintel_lsp::{LintError, LintRequest, Linter, Server};
use lintel_types::{LintFinding, OffsetRange, TextReplacement};
use serde_json::{Value, json};
use tokio::io::{self, DuplexStream, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;

pub const URI: &str = "file:///work/src/app.js";

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Linter whose answer is set by the test.
#[derive(Default)]
pub struct ScriptedLinter {
    answer: Mutex<Option<Result<Vec<LintFinding>, String>>>,
    texts: Mutex<Vec<String>>,
}

impl ScriptedLinter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn answer(&self, findings: Vec<LintFinding>) {
        *self.answer.lock().unwrap() = Some(Ok(findings));
    }

    /// Fail every lint with a backend message, classified like real output.
    pub fn fail(&self, message: &str) {
        *self.answer.lock().unwrap() = Some(Err(message.to_string()));
    }

    /// Texts linted so far, oldest first.
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

impl Linter for ScriptedLinter {
    fn lint(&self, request: &LintRequest<'_>) -> Result<Vec<LintFinding>, LintError> {
        self.texts.lock().unwrap().push(request.text.to_string());
        match self.answer.lock().unwrap().clone() {
            Some(Ok(findings)) => Ok(findings),
            Some(Err(message)) => Err(LintError::classify(&message)),
            None => Ok(Vec::new()),
        }
    }
}

/// A missing-semicolon finding at 1-based `line`, inserting at `offset`.
pub fn semi(line: i64, column: i64, offset: usize) -> LintFinding {
    LintFinding {
        line,
        column,
        severity: 2,
        rule_id: Some("semi".into()),
        message: "Missing semicolon.".into(),
        fix: Some(TextReplacement::new(OffsetRange::new(offset, offset), ";")),
        ..LintFinding::default()
    }
}

/// The editor side of a session.
pub struct TestClient {
    reader: FrameReader<ReadHalf<DuplexStream>>,
    writer: FrameWriter<WriteHalf<DuplexStream>>,
    server: JoinHandle<anyhow::Result<()>>,
    next_id: i64,
    /// Frames read while looking for something else.
    backlog: Vec<Value>,
}

impl TestClient {
    pub fn start(linter: Arc<ScriptedLinter>) -> Self {
        let (client_end, server_end) = io::duplex(1 << 16);
        let (server_in, server_out) = io::split(server_end);
        let server = tokio::spawn(Server::new(linter).run(server_in, server_out));

        let (client_in, client_out) = io::split(client_end);
        Self {
            reader: FrameReader::new(client_in),
            writer: FrameWriter::new(client_out),
            server,
            next_id: 1,
            backlog: Vec::new(),
        }
    }

    /// Started and past `initialize`/`initialized`.
    pub async fn initialized(linter: Arc<ScriptedLinter>) -> Self {
        let mut client = Self::start(linter);
        client.initialize(Value::Null).await;
        client
    }

    pub async fn send(&mut self, frame: Value) {
        self.writer.write_frame(&frame).await.unwrap();
    }

    pub async fn notify(&mut self, method: &str, params: Value) {
        self.send(json!({ "jsonrpc": "2.0", "method": method, "params": params }))
            .await;
    }

    /// Send a request and return its id.
    pub async fn request(&mut self, method: &str, params: Value) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        self.send(json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }))
            .await;
        id
    }

    pub async fn call(&mut self, method: &str, params: Value) -> Value {
        let id = self.request(method, params).await;
        self.response(id).await
    }

    async fn read(&mut self) -> Value {
        match tokio::time::timeout(RECV_TIMEOUT, self.reader.read_frame()).await {
            Ok(Ok(Some(frame))) => frame,
            Ok(Ok(None)) => panic!("server closed the stream"),
            Ok(Err(err)) => panic!("bad frame from server: {err}"),
            Err(_) => panic!("timed out waiting for the server"),
        }
    }

    /// First frame matching `pred`, looking at the backlog before the wire.
    pub async fn next_matching(&mut self, pred: impl Fn(&Value) -> bool) -> Value {
        if let Some(pos) = self.backlog.iter().position(&pred) {
            return self.backlog.remove(pos);
        }
        loop {
            let frame = self.read().await;
            if pred(&frame) {
                return frame;
            }
            self.backlog.push(frame);
        }
    }

    /// The full response frame for request `id`.
    pub async fn response(&mut self, id: i64) -> Value {
        self.next_matching(|f| f["id"] == id && f.get("method").is_none())
            .await
    }

    pub async fn notification(&mut self, method: &str) -> Value {
        self.next_matching(|f| f["method"] == method && f.get("id").is_none())
            .await
    }

    /// A request the server sent to the client.
    pub async fn server_request(&mut self, method: &str) -> Value {
        self.next_matching(|f| f["method"] == method && f.get("id").is_some())
            .await
    }

    pub async fn reply(&mut self, id: &Value, result: Value) {
        self.send(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
            .await;
    }

    /// Frames seen so far but not consumed by a matcher.
    pub fn backlog(&self) -> &[Value] {
        &self.backlog
    }

    pub async fn initialize(&mut self, options: Value) -> Value {
        let response = self
            .call(
                "initialize",
                json!({ "processId": null, "capabilities": {}, "initializationOptions": options }),
            )
            .await;
        self.notify("initialized", json!({})).await;
        response
    }

    pub async fn open(&mut self, version: i32, text: &str) {
        self.notify(
            "textDocument/didOpen",
            json!({
                "textDocument": {
                    "uri": URI,
                    "languageId": "javascript",
                    "version": version,
                    "text": text
                }
            }),
        )
        .await;
    }

    pub async fn change(&mut self, version: i32, text: &str) {
        self.notify(
            "textDocument/didChange",
            json!({
                "textDocument": { "uri": URI, "version": version },
                "contentChanges": [{ "text": text }]
            }),
        )
        .await;
    }

    /// Next diagnostics published for [`URI`].
    pub async fn diagnostics(&mut self) -> Value {
        let frame = self.notification("textDocument/publishDiagnostics").await;
        assert_eq!(frame["params"]["uri"], URI);
        frame["params"].clone()
    }

    /// Code actions for every diagnostic in `diagnostics`.
    pub async fn code_actions(&mut self, diagnostics: &Value) -> Vec<Value> {
        let response = self
            .call(
                "textDocument/codeAction",
                json!({
                    "textDocument": { "uri": URI },
                    "range": {
                        "start": { "line": 0, "character": 0 },
                        "end": { "line": 99, "character": 0 }
                    },
                    "context": { "diagnostics": diagnostics }
                }),
            )
            .await;
        response["result"].as_array().cloned().unwrap_or_default()
    }

    /// Orderly `shutdown` + `exit`; returns what the server loop returned.
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        let response = self.call("shutdown", Value::Null).await;
        assert!(response["result"].is_null());
        self.notify("exit", Value::Null).await;
        tokio::time::timeout(RECV_TIMEOUT, self.server)
            .await
            .expect("server did not stop")
            .expect("server task panicked")
    }
}
