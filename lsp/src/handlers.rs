//! Queue registrations: validation, code actions, command execution.
//!
//! Each handler is registered with a version provider that reads the live
//! version of the document its params name, so the queue can void work
//! whose document changed between enqueue and dispatch.

use lintel_types::{DocumentUri, DocumentVersion};
use serde_json::Value;
use thiserror::Error;

use crate::code_actions::{self, fixes_edit};
use crate::commands::{
    ALL_COMMANDS, APPLY_AUTO_FIX, APPLY_DISABLE_FILE, APPLY_DISABLE_LINE, APPLY_SAME_FIXES,
    APPLY_SINGLE_FIX, CommandArgs,
};
use crate::context::ServerContext;
use crate::documents::VersionRegistry;
use crate::fixes::{EmptyCollection, Fixes};
use crate::protocol::{
    CodeActionParams, ExecuteCommandParams, MessageParams, MessageType, ResponseError,
    TextDocumentIdentifier, WorkspaceEdit,
};
use crate::queue::{HandlerOutcome, MessageQueue};

/// Internal notification that runs one validation pass.
pub const METHOD_VALIDATE: &str = "lintel/validate";
pub const METHOD_CODE_ACTION: &str = "textDocument/codeAction";
pub const METHOD_EXECUTE_COMMAND: &str = "workspace/executeCommand";

pub fn register(queue: &mut MessageQueue<ServerContext>) {
    queue.register_notification(
        METHOD_VALIDATE,
        Box::new(validate),
        Some(Box::new(|ctx: &ServerContext, params: &Value| {
            live_version(ctx, params.get("uri"))
        })),
    );
    queue.register_request(
        METHOD_CODE_ACTION,
        Box::new(code_action),
        Some(Box::new(|ctx: &ServerContext, params: &Value| {
            live_version(ctx, params.pointer("/textDocument/uri"))
        })),
    );
    queue.register_request(
        METHOD_EXECUTE_COMMAND,
        Box::new(execute_command),
        Some(Box::new(|ctx: &ServerContext, params: &Value| {
            live_version(ctx, params.pointer("/arguments/0/uri"))
        })),
    );
}

fn live_version(ctx: &ServerContext, uri: Option<&Value>) -> Option<DocumentVersion> {
    let uri = uri?.as_str()?;
    ctx.documents.version(&DocumentUri::new(uri))
}

/// Params of [`METHOD_VALIDATE`].
#[must_use]
pub fn validate_params(uri: &DocumentUri) -> Value {
    serde_json::to_value(TextDocumentIdentifier { uri: uri.clone() }).unwrap_or_default()
}

fn validate(ctx: &mut ServerContext, params: Value) {
    match serde_json::from_value::<TextDocumentIdentifier>(params) {
        Ok(target) => ctx.validate(&target.uri),
        Err(err) => tracing::warn!(error = %err, "malformed validate params"),
    }
}

fn code_action(ctx: &mut ServerContext, params: Value) -> HandlerOutcome {
    let params: CodeActionParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(err) => return HandlerOutcome::Ready(Err(ResponseError::invalid_params(err))),
    };

    let uri = &params.text_document.uri;
    let Some(document) = ctx.documents.get(uri) else {
        ctx.commands.clear();
        return HandlerOutcome::Ready(Ok(Value::Array(Vec::new())));
    };

    let actions = match code_actions::compute(
        document,
        ctx.correlation.get(uri),
        &params,
        &ctx.settings,
        &mut ctx.commands,
    ) {
        Ok(actions) => actions,
        Err(err) => return HandlerOutcome::Ready(Err(ResponseError::internal(err))),
    };
    HandlerOutcome::Ready(serde_json::to_value(actions).map_err(ResponseError::internal))
}

/// Why an `executeCommand` applied nothing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StaleApply {
    #[error("{0} is not open")]
    NotOpen(DocumentUri),
    #[error("document is at version {live}, command was issued for {requested}")]
    DocumentMoved {
        requested: DocumentVersion,
        live: DocumentVersion,
    },
    #[error("fixes on record do not belong to version {0}")]
    FixesOutdated(DocumentVersion),
    #[error("no edit prepared for {0}")]
    NotPrepared(String),
}

/// Why [`resolve_edit`] produced no edit: stale input, or a broken fix
/// snapshot.
#[derive(Debug, Error, PartialEq, Eq)]
enum Unresolved {
    #[error(transparent)]
    Stale(#[from] StaleApply),
    #[error(transparent)]
    Empty(#[from] EmptyCollection),
}

/// The edit `command` applies, provided the caller, the live document and
/// the recorded fixes all agree on the version.
fn resolve_edit(
    ctx: &ServerContext,
    command: &str,
    args: &CommandArgs,
) -> Result<Option<WorkspaceEdit>, Unresolved> {
    let Some(document) = ctx.documents.get(&args.uri) else {
        return Err(StaleApply::NotOpen(args.uri.clone()).into());
    };
    if document.version() != args.version {
        return Err(StaleApply::DocumentMoved {
            requested: args.version,
            live: document.version(),
        }
        .into());
    }

    let fixes = ctx.correlation.get(&args.uri).map(Fixes::new);
    let recorded = fixes.as_ref().map(Fixes::document_version).transpose()?;
    if recorded.is_some_and(|version| version != args.version) {
        return Err(StaleApply::FixesOutdated(args.version).into());
    }

    if command == APPLY_AUTO_FIX {
        let overlap_free = fixes.map(|fixes| fixes.overlap_free()).unwrap_or_default();
        if overlap_free.is_empty() {
            return Ok(None);
        }
        return Ok(Some(fixes_edit(document, &overlap_free)));
    }

    let key = args.cache_key(command);
    ctx.commands
        .lookup(&args.uri, args.version, &key)
        .cloned()
        .map(Some)
        .ok_or_else(|| StaleApply::NotPrepared(key).into())
}

fn edit_label(command: &str, rule: Option<&str>) -> String {
    let rule = rule.unwrap_or("lint");
    match command {
        APPLY_SINGLE_FIX => format!("Fix this {rule} problem"),
        APPLY_SAME_FIXES => format!("Fix all {rule} problems"),
        APPLY_DISABLE_LINE => format!("Disable {rule} for this line"),
        APPLY_DISABLE_FILE => format!("Disable {rule} for the entire file"),
        _ => "Fix all auto-fixable problems".to_string(),
    }
}

fn execute_command(ctx: &mut ServerContext, params: Value) -> HandlerOutcome {
    let params: ExecuteCommandParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(err) => return HandlerOutcome::Ready(Err(ResponseError::invalid_params(err))),
    };
    if !ALL_COMMANDS.contains(&params.command.as_str()) {
        return HandlerOutcome::Ready(Err(ResponseError::invalid_params(format!(
            "unknown command {}",
            params.command
        ))));
    }
    let Some(args) = CommandArgs::from_arguments(&params.arguments) else {
        return HandlerOutcome::Ready(Err(ResponseError::invalid_params(
            "expected a { uri, version } argument",
        )));
    };

    let edit = match resolve_edit(ctx, &params.command, &args) {
        Ok(Some(edit)) => edit,
        Ok(None) => return HandlerOutcome::Ready(Ok(Value::Null)),
        Err(Unresolved::Stale(stale)) => {
            tracing::debug!(command = %params.command, uri = %args.uri, reason = %stale, "not applying");
            return HandlerOutcome::Ready(Ok(Value::Null));
        }
        Err(Unresolved::Empty(err)) => {
            return HandlerOutcome::Ready(Err(ResponseError::internal(err)));
        }
    };

    let client = ctx.client.clone();
    let label = edit_label(&params.command, args.rule_id.as_deref());
    HandlerOutcome::deferred(async move {
        match client.apply_edit(Some(label.clone()), edit).await {
            Ok(result) if result.applied => {}
            Ok(result) => {
                let reason = result
                    .failure_reason
                    .unwrap_or_else(|| "no reason given".to_string());
                tracing::warn!(%label, %reason, "client did not apply edit");
                client.log_message(MessageParams::new(
                    MessageType::Error,
                    format!("{label}: edit was not applied ({reason})"),
                ));
            }
            Err(err) => {
                tracing::warn!(%label, error = %err, "applyEdit failed");
                client.log_message(MessageParams::new(
                    MessageType::Error,
                    format!("{label}: edit could not be applied ({err})"),
                ));
            }
        }
        Ok(Value::Null)
    })
}
