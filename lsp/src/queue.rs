//! Ordered dispatch queue for handler work.
//!
//! Requests and notifications are processed strictly one at a time, in
//! arrival order. Each message carries the document version observed when
//! it was enqueued; at dispatch the registered version provider is asked
//! again, and work prepared for an older document is rejected (requests) or
//! dropped (notifications) instead of running against newer text.
//!
//! The queue never awaits anything itself. A handler that needs to wait
//! returns [`HandlerOutcome::Deferred`]; the future is spawned and resolves
//! the caller's sink when it settles, so a slow request does not hold up
//! the next message.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;

use lintel_types::DocumentVersion;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::protocol::{HandlerResult, ResponseError};

pub type BoxedHandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'static>>;

/// What a request handler produced.
pub enum HandlerOutcome {
    Ready(HandlerResult),
    Deferred(BoxedHandlerFuture),
}

impl HandlerOutcome {
    pub fn deferred(future: impl Future<Output = HandlerResult> + Send + 'static) -> Self {
        Self::Deferred(Box::pin(future))
    }
}

impl From<HandlerResult> for HandlerOutcome {
    fn from(result: HandlerResult) -> Self {
        Self::Ready(result)
    }
}

pub type RequestHandler<S> = Box<dyn Fn(&mut S, Value) -> HandlerOutcome + Send>;
pub type NotificationHandler<S> = Box<dyn Fn(&mut S, Value) + Send>;
/// Reports the live version of the document a message targets.
pub type VersionProvider<S> = Box<dyn Fn(&S, &Value) -> Option<DocumentVersion> + Send>;

struct Registration<H, S> {
    handler: H,
    version_provider: Option<VersionProvider<S>>,
}

enum Message {
    Request {
        method: String,
        params: Value,
        version: Option<DocumentVersion>,
        token: CancellationToken,
        sink: oneshot::Sender<HandlerResult>,
    },
    Notification {
        method: String,
        params: Value,
        version: Option<DocumentVersion>,
    },
}

/// What [`MessageQueue::tick`] did with the message it popped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler ran (its result may still be pending).
    Dispatched,
    /// The request's token was cancelled before dispatch.
    Cancelled,
    /// A request was rejected because its document moved on.
    Stale,
    /// A notification was dropped because its document moved on.
    Dropped,
    /// No handler is registered for the notification's method.
    Unknown,
}

/// FIFO of pending handler work over server state `S`.
pub struct MessageQueue<S> {
    queue: VecDeque<Message>,
    requests: HashMap<String, Registration<RequestHandler<S>, S>>,
    notifications: HashMap<String, Registration<NotificationHandler<S>, S>>,
    drain_scheduled: bool,
}

impl<S> Default for MessageQueue<S> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            requests: HashMap::new(),
            notifications: HashMap::new(),
            drain_scheduled: false,
        }
    }
}

impl<S> MessageQueue<S> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_request(
        &mut self,
        method: impl Into<String>,
        handler: RequestHandler<S>,
        version_provider: Option<VersionProvider<S>>,
    ) {
        self.requests.insert(
            method.into(),
            Registration {
                handler,
                version_provider,
            },
        );
    }

    pub fn register_notification(
        &mut self,
        method: impl Into<String>,
        handler: NotificationHandler<S>,
        version_provider: Option<VersionProvider<S>>,
    ) {
        self.notifications.insert(
            method.into(),
            Registration {
                handler,
                version_provider,
            },
        );
    }

    /// Queue a request and hand back the receiving end of its result.
    ///
    /// The document version is snapshotted now through the method's
    /// provider. Methods without a handler resolve immediately with
    /// `MethodNotFound` and never enter the queue.
    pub fn enqueue_request(
        &mut self,
        state: &S,
        method: &str,
        params: Value,
        token: CancellationToken,
    ) -> oneshot::Receiver<HandlerResult> {
        let (sink, receiver) = oneshot::channel();

        let Some(registration) = self.requests.get(method) else {
            tracing::debug!(method, "no handler for request");
            let _ = sink.send(Err(ResponseError::method_not_found(method)));
            return receiver;
        };

        let version = registration
            .version_provider
            .as_ref()
            .and_then(|provider| provider(state, &params));

        self.push(Message::Request {
            method: method.to_string(),
            params,
            version,
            token,
            sink,
        });
        receiver
    }

    /// Queue a notification with the version snapshot the caller observed.
    pub fn enqueue_notification(
        &mut self,
        method: &str,
        params: Value,
        version: Option<DocumentVersion>,
    ) {
        self.push(Message::Notification {
            method: method.to_string(),
            params,
            version,
        });
    }

    fn push(&mut self, message: Message) {
        self.queue.push_back(message);
        self.drain_scheduled = true;
    }

    /// Whether a tick is owed. Cleared by the tick that empties the queue.
    #[must_use]
    pub fn is_drain_scheduled(&self) -> bool {
        self.drain_scheduled
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Process exactly one message. `None` when the queue was empty.
    ///
    /// Deferred request results are spawned onto the current runtime.
    pub fn tick(&mut self, state: &mut S) -> Option<DispatchOutcome> {
        let message = self.queue.pop_front();
        self.drain_scheduled = !self.queue.is_empty();
        let message = message?;

        let outcome = match message {
            Message::Request {
                method,
                params,
                version,
                token,
                sink,
            } => self.dispatch_request(state, &method, params, version, &token, sink),
            Message::Notification {
                method,
                params,
                version,
            } => self.dispatch_notification(state, &method, params, version),
        };
        Some(outcome)
    }

    fn dispatch_request(
        &self,
        state: &mut S,
        method: &str,
        params: Value,
        version: Option<DocumentVersion>,
        token: &CancellationToken,
        sink: oneshot::Sender<HandlerResult>,
    ) -> DispatchOutcome {
        if token.is_cancelled() {
            tracing::debug!(method, "request cancelled before dispatch");
            let _ = sink.send(Err(ResponseError::cancelled()));
            return DispatchOutcome::Cancelled;
        }

        // Only registered methods are ever queued.
        let Some(registration) = self.requests.get(method) else {
            let _ = sink.send(Err(ResponseError::method_not_found(method)));
            return DispatchOutcome::Unknown;
        };

        if is_stale(registration.version_provider.as_ref(), state, &params, version) {
            tracing::debug!(method, ?version, "request targets an outdated document");
            let _ = sink.send(Err(ResponseError::cancelled()));
            return DispatchOutcome::Stale;
        }

        match (registration.handler)(state, params) {
            HandlerOutcome::Ready(result) => {
                let _ = sink.send(result);
            }
            HandlerOutcome::Deferred(future) => {
                tokio::spawn(async move {
                    let _ = sink.send(future.await);
                });
            }
        }
        DispatchOutcome::Dispatched
    }

    fn dispatch_notification(
        &self,
        state: &mut S,
        method: &str,
        params: Value,
        version: Option<DocumentVersion>,
    ) -> DispatchOutcome {
        let Some(registration) = self.notifications.get(method) else {
            tracing::trace!(method, "no handler for notification");
            return DispatchOutcome::Unknown;
        };

        if is_stale(registration.version_provider.as_ref(), state, &params, version) {
            tracing::debug!(method, ?version, "dropping notification for outdated document");
            return DispatchOutcome::Dropped;
        }

        (registration.handler)(state, params);
        DispatchOutcome::Dispatched
    }
}

/// A message is stale only when it carries a snapshot and the provider now
/// reports something else.
fn is_stale<S>(
    provider: Option<&VersionProvider<S>>,
    state: &S,
    params: &Value,
    snapshot: Option<DocumentVersion>,
) -> bool {
    match (provider, snapshot) {
        (Some(provider), Some(snapshot)) => provider(state, params) != Some(snapshot),
        _ => false,
    }
}
