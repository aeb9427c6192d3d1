//! The server loop: framing tasks, lifecycle, and the drain scheduler.
//!
//! A reader task turns input bytes into frames and a writer task pushes
//! outgoing frames; everything in between happens on the loop, one frame or
//! one queue tick at a time. Document sync is applied on arrival, before any
//! queued work, so the queue's staleness checks always see live versions.

use std::collections::HashMap;
use std::future;
use std::sync::Arc;

use anyhow::{Context, Result};
use lintel_types::DocumentUri;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::{ClientHandle, WriterCommand};
use crate::codec::{CodecError, FrameReader, FrameWriter};
use crate::commands::ALL_COMMANDS;
use crate::context::ServerContext;
use crate::documents::VersionRegistry;
use crate::handlers::{self, METHOD_VALIDATE};
use crate::linter::Linter;
use crate::protocol::{
    self, CancelParams, DidChangeConfigurationParams, DidChangeTextDocumentParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, DidSaveTextDocumentParams,
    InitializeParams, Incoming, RequestId, ResponseError, error_codes,
};
use crate::queue::MessageQueue;
use crate::settings::{RunTrigger, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Uninitialized,
    Running,
    ShutdownRequested,
}

/// Whether the loop keeps going after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// A lint-bridge language server over one input/output pair.
pub struct Server {
    linter: Arc<dyn Linter>,
}

impl Server {
    #[must_use]
    pub fn new(linter: Arc<dyn Linter>) -> Self {
        Self { linter }
    }

    /// Serve until `exit` arrives or the input closes.
    pub async fn run<R, W>(self, input: R, output: W) -> Result<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<WriterCommand>();
        let writer_handle: JoinHandle<()> = tokio::spawn(async move {
            let mut writer = FrameWriter::new(output);
            while let Some(cmd) = writer_rx.recv().await {
                match cmd {
                    WriterCommand::Send(frame) => {
                        if let Err(e) = writer.write_frame(&frame).await {
                            tracing::warn!(error = %e, "write to client failed");
                            break;
                        }
                    }
                    WriterCommand::Shutdown => break,
                }
            }
        });

        let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<Result<Value, CodecError>>();
        let reader_handle: JoinHandle<()> = tokio::spawn(async move {
            let mut reader = FrameReader::new(input);
            loop {
                match reader.read_frame().await {
                    Ok(Some(frame)) => {
                        if frame_tx.send(Ok(frame)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = frame_tx.send(Err(e));
                        break;
                    }
                }
            }
        });

        let client = ClientHandle::new(writer_tx);
        let mut session = Session::new(ServerContext::new(self.linter, client.clone()));
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<RequestId>();

        let result = loop {
            tokio::select! {
                biased;
                frame = frame_rx.recv() => match frame {
                    Some(Ok(frame)) => {
                        if session.handle_frame(&frame, &done_tx).await == Flow::Exit {
                            break Ok(());
                        }
                    }
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "reading from client failed");
                        break Err::<(), _>(e).context("reading client input");
                    }
                    None => {
                        tracing::info!("client closed the input stream");
                        break Ok(());
                    }
                },
                Some(id) = done_rx.recv() => {
                    session.tokens.remove(&id);
                }
                () = future::ready(()), if session.queue.is_drain_scheduled() => {
                    if let Some(outcome) = session.queue.tick(&mut session.ctx) {
                        tracing::trace!(?outcome, remaining = session.queue.len(), "tick");
                    }
                }
            }
        };

        client.shutdown();
        reader_handle.abort();
        let _ = writer_handle.await;
        result
    }
}

struct Session {
    ctx: ServerContext,
    queue: MessageQueue<ServerContext>,
    /// Cancellation tokens of requests whose response is still owed.
    tokens: HashMap<RequestId, CancellationToken>,
    lifecycle: Lifecycle,
}

fn parse<T: DeserializeOwned>(method: &str, params: Value) -> Option<T> {
    match serde_json::from_value(params) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!(method, error = %e, "malformed params");
            None
        }
    }
}

impl Session {
    fn new(ctx: ServerContext) -> Self {
        let mut queue = MessageQueue::new();
        handlers::register(&mut queue);
        Self {
            ctx,
            queue,
            tokens: HashMap::new(),
            lifecycle: Lifecycle::Uninitialized,
        }
    }

    async fn handle_frame(
        &mut self,
        frame: &Value,
        done_tx: &mpsc::UnboundedSender<RequestId>,
    ) -> Flow {
        let Some(incoming) = protocol::parse_incoming(frame) else {
            tracing::trace!("ignoring malformed JSON-RPC frame");
            return Flow::Continue;
        };

        match incoming {
            Incoming::Response { id, body } => {
                self.ctx.client.resolve(&id, body).await;
                Flow::Continue
            }
            Incoming::Request { id, method, params } => {
                self.handle_request(id, &method, params, done_tx);
                Flow::Continue
            }
            Incoming::Notification { method, params } => self.handle_notification(&method, params),
        }
    }

    fn handle_request(
        &mut self,
        id: RequestId,
        method: &str,
        params: Value,
        done_tx: &mpsc::UnboundedSender<RequestId>,
    ) {
        let response = match (method, self.lifecycle) {
            ("initialize", Lifecycle::Uninitialized) => {
                if let Some(params) = parse::<InitializeParams>(method, params) {
                    let options = params.initialization_options.unwrap_or_default();
                    self.apply_settings(&options);
                }
                self.lifecycle = Lifecycle::Running;
                tracing::info!(linter = %self.ctx.settings.linter.command, "initialized");
                Ok(protocol::initialize_result(ALL_COMMANDS))
            }
            ("initialize", _) => Err(ResponseError::new(
                error_codes::INVALID_REQUEST,
                "initialize was already received",
            )),
            (_, Lifecycle::Uninitialized) => Err(ResponseError::new(
                error_codes::SERVER_NOT_INITIALIZED,
                "server is not initialized",
            )),
            ("shutdown", _) => {
                self.lifecycle = Lifecycle::ShutdownRequested;
                Ok(Value::Null)
            }
            (_, Lifecycle::ShutdownRequested) => Err(ResponseError::new(
                error_codes::INVALID_REQUEST,
                "server is shutting down",
            )),
            (_, Lifecycle::Running) => {
                self.enqueue_request(id, method, params, done_tx);
                return;
            }
        };
        self.ctx.client.respond(&id, response);
    }

    fn enqueue_request(
        &mut self,
        id: RequestId,
        method: &str,
        params: Value,
        done_tx: &mpsc::UnboundedSender<RequestId>,
    ) {
        let token = CancellationToken::new();
        self.tokens.insert(id.clone(), token.clone());
        let result = self.queue.enqueue_request(&self.ctx, method, params, token);

        let client = self.ctx.client.clone();
        let done_tx = done_tx.clone();
        let method = method.to_string();
        tokio::spawn(async move {
            let result = match result.await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(%method, %id, "handler dropped the request without answering");
                    Err(ResponseError::internal("request handler failed"))
                }
            };
            client.respond(&id, result);
            let _ = done_tx.send(id);
        });
    }

    fn handle_notification(&mut self, method: &str, params: Value) -> Flow {
        match method {
            "exit" => {
                if self.lifecycle != Lifecycle::ShutdownRequested {
                    tracing::warn!("exit without shutdown");
                }
                return Flow::Exit;
            }
            "$/cancelRequest" => {
                if let Some(params) = parse::<CancelParams>(method, params)
                    && let Some(token) = self.tokens.get(&params.id)
                {
                    tracing::debug!(id = %params.id, "cancel requested");
                    token.cancel();
                }
                return Flow::Continue;
            }
            _ => {}
        }

        if self.lifecycle != Lifecycle::Running {
            tracing::debug!(method, "notification outside a running session");
            return Flow::Continue;
        }

        match method {
            "initialized" => {}
            "textDocument/didOpen" => {
                if let Some(params) = parse::<DidOpenTextDocumentParams>(method, params) {
                    let uri = params.text_document.uri.clone();
                    self.ctx.documents.open(params.text_document);
                    self.schedule_validation(&uri);
                }
            }
            "textDocument/didChange" => {
                if let Some(params) = parse::<DidChangeTextDocumentParams>(method, params) {
                    let uri = params.text_document.uri;
                    let changed = self.ctx.documents.change(
                        &uri,
                        params.text_document.version,
                        &params.content_changes,
                    );
                    if changed.is_none() {
                        tracing::debug!(%uri, "change for a document that is not open");
                    } else if self.ctx.settings.run == RunTrigger::OnType {
                        self.schedule_validation(&uri);
                    }
                }
            }
            "textDocument/didSave" => {
                if let Some(params) = parse::<DidSaveTextDocumentParams>(method, params)
                    && self.ctx.settings.run == RunTrigger::OnSave
                {
                    self.schedule_validation(&params.text_document.uri);
                }
            }
            "textDocument/didClose" => {
                if let Some(params) = parse::<DidCloseTextDocumentParams>(method, params) {
                    self.ctx.document_closed(&params.text_document.uri);
                }
            }
            "workspace/didChangeConfiguration" => {
                if let Some(params) = parse::<DidChangeConfigurationParams>(method, params) {
                    match Settings::from_configuration_change(&params.settings) {
                        Some(Ok(settings)) => self.ctx.settings = settings,
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "ignoring invalid settings");
                        }
                        None => {}
                    }
                    self.revalidate_all();
                }
            }
            "workspace/didChangeWatchedFiles" => self.revalidate_all(),
            _ => tracing::trace!(method, "ignoring notification"),
        }
        Flow::Continue
    }

    fn apply_settings(&mut self, options: &Value) {
        match Settings::from_json(options) {
            Ok(settings) => self.ctx.settings = settings,
            Err(e) => tracing::warn!(error = %e, "invalid initializationOptions, using defaults"),
        }
    }

    fn schedule_validation(&mut self, uri: &DocumentUri) {
        let version = self.ctx.documents.version(uri);
        self.queue
            .enqueue_notification(METHOD_VALIDATE, handlers::validate_params(uri), version);
    }

    fn revalidate_all(&mut self) {
        let open = self.ctx.environment_changed();
        tracing::debug!(documents = open.len(), "environment changed, revalidating");
        for (uri, version) in open {
            self.queue
                .enqueue_notification(METHOD_VALIDATE, handlers::validate_params(&uri), Some(version));
        }
    }
}
