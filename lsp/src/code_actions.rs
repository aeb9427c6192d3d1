//! Code actions offered for lint diagnostics.
//!
//! For each rule that has a fix among the diagnostics in the request, the
//! actions come out in a fixed order: one quick fix per diagnostic, disable
//! for this line, fix all problems of the rule, disable for the file. A
//! single "fix all auto-fixable problems" action closes the list. Every
//! command's edit is prepared here and parked in the [`CommandCache`].

use lintel_types::{AutoFix, Diagnostic, Position, Range};

use crate::commands::{
    APPLY_ALL_FIXES, APPLY_DISABLE_FILE, APPLY_DISABLE_LINE, APPLY_SAME_FIXES, APPLY_SINGLE_FIX,
    CommandArgs, CommandCache,
};
use crate::correlation::FixMap;
use crate::documents::TextDocument;
use crate::fixes::{EmptyCollection, Fixes};
use crate::protocol::{
    CodeAction, CodeActionParams, Command, KIND_QUICK_FIX, KIND_SOURCE_FIX_ALL_LINTEL, TextEdit,
    VersionedTextDocumentIdentifier, WorkspaceEdit,
};
use crate::settings::{CommentLocation, DisableRuleComment, Settings};

const FIX_ALL_TITLE: &str = "Fix all auto-fixable problems";

/// Which family of actions the client asked for through `context.only`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requested {
    QuickFixes,
    FixAll,
    Nothing,
}

/// A kind filter admits a kind when it equals it or is one of its
/// dot-separated prefixes (`source` admits `source.fixAll.lintel`).
fn admits(filter: &str, kind: &str) -> bool {
    kind == filter
        || kind
            .strip_prefix(filter)
            .is_some_and(|rest| rest.starts_with('.'))
}

fn requested(only: Option<&[String]>) -> Requested {
    let Some(only) = only else {
        return Requested::QuickFixes;
    };
    if only
        .iter()
        .any(|filter| admits(filter, KIND_SOURCE_FIX_ALL_LINTEL))
    {
        Requested::FixAll
    } else if only.iter().any(|filter| admits(filter, KIND_QUICK_FIX)) {
        Requested::QuickFixes
    } else {
        Requested::Nothing
    }
}

fn versioned(document: &TextDocument) -> VersionedTextDocumentIdentifier {
    VersionedTextDocumentIdentifier {
        uri: document.uri().clone(),
        version: document.version(),
    }
}

fn text_edit(document: &TextDocument, fix: &AutoFix) -> TextEdit {
    let range = fix.range();
    TextEdit {
        range: Range::new(
            document.position_at(range.start),
            document.position_at(range.end),
        ),
        new_text: fix.edit().text.clone(),
    }
}

/// One workspace edit applying `fixes` to `document`.
pub(crate) fn fixes_edit(document: &TextDocument, fixes: &[&AutoFix]) -> WorkspaceEdit {
    let edits = fixes.iter().map(|fix| text_edit(document, fix)).collect();
    WorkspaceEdit::for_document(versioned(document), edits)
}

fn disable_line_edit(
    document: &TextDocument,
    line: u32,
    rule: &str,
    comment: &DisableRuleComment,
) -> TextEdit {
    let prefix = &comment.comment_prefix;
    match comment.location {
        CommentLocation::SeparateLine => TextEdit {
            range: Range::point(Position::new(line, 0)),
            new_text: format!(
                "{}// {prefix}-disable-next-line {rule}\n",
                document.line_indentation(line)
            ),
        },
        CommentLocation::SameLine => TextEdit {
            range: Range::point(document.line_end(line)),
            new_text: format!(" // {prefix}-disable-line {rule}"),
        },
    }
}

fn disable_file_edit(document: &TextDocument, rule: &str, comment: &DisableRuleComment) -> TextEdit {
    // Keep a shebang on the first line.
    let line = u32::from(document.text().starts_with("#!"));
    TextEdit {
        range: Range::point(Position::new(line, 0)),
        new_text: format!("/* {}-disable {rule} */\n", comment.comment_prefix),
    }
}

/// Builds actions and registers their edits under the matching cache keys.
struct ActionBuilder<'a> {
    document: &'a TextDocument,
    cache: &'a mut CommandCache,
    actions: Vec<CodeAction>,
}

impl ActionBuilder<'_> {
    fn push(
        &mut self,
        title: String,
        command: &str,
        args: CommandArgs,
        diagnostic: Option<&Diagnostic>,
        edit: WorkspaceEdit,
    ) {
        self.cache.insert(args.cache_key(command), edit);
        self.actions.push(CodeAction {
            title: title.clone(),
            kind: Some(KIND_QUICK_FIX.to_string()),
            diagnostics: diagnostic.map(|d| vec![d.clone()]),
            edit: None,
            command: Some(Command {
                title,
                command: command.to_string(),
                arguments: vec![args.to_value()],
            }),
        });
    }

    fn args(&self, rule: Option<&str>) -> CommandArgs {
        CommandArgs::new(
            self.document.uri().clone(),
            self.document.version(),
            rule,
        )
    }
}

/// Compute the actions for one `textDocument/codeAction` request.
///
/// `fixes` is the document's correlation-store entry. Nothing is offered
/// when it is missing or was computed for another version of the document.
/// The command cache is cleared either way.
pub fn compute(
    document: &TextDocument,
    fixes: Option<&FixMap>,
    params: &CodeActionParams,
    settings: &Settings,
    cache: &mut CommandCache,
) -> Result<Vec<CodeAction>, EmptyCollection> {
    cache.clear();

    let Some(fixes) = fixes.map(Fixes::new) else {
        return Ok(Vec::new());
    };
    if fixes.document_version()? != document.version() {
        return Ok(Vec::new());
    }
    cache.reset(document.uri(), document.version());

    Ok(match requested(params.context.only.as_deref()) {
        Requested::FixAll => fix_all_action(document, &fixes, settings)
            .into_iter()
            .collect(),
        Requested::QuickFixes => quick_fixes(document, &fixes, params, settings, cache),
        Requested::Nothing => Vec::new(),
    })
}

/// The `source.fixAll.lintel` action. Carries its edit directly so the
/// client can apply it on save without a round trip.
fn fix_all_action(
    document: &TextDocument,
    fixes: &Fixes<'_>,
    settings: &Settings,
) -> Option<CodeAction> {
    if !settings.auto_fix {
        return None;
    }
    let overlap_free = fixes.overlap_free();
    if overlap_free.is_empty() {
        return None;
    }
    Some(CodeAction {
        title: FIX_ALL_TITLE.to_string(),
        kind: Some(KIND_SOURCE_FIX_ALL_LINTEL.to_string()),
        diagnostics: None,
        edit: Some(fixes_edit(document, &overlap_free)),
        command: None,
    })
}

fn quick_fixes(
    document: &TextDocument,
    fixes: &Fixes<'_>,
    params: &CodeActionParams,
    settings: &Settings,
    cache: &mut CommandCache,
) -> Vec<CodeAction> {
    let scoped = fixes.scoped(&params.context.diagnostics);
    if scoped.is_empty() {
        return Vec::new();
    }

    let mut by_rule: Vec<(&str, Vec<(&Diagnostic, &AutoFix)>)> = Vec::new();
    for (diagnostic, fix) in scoped {
        match by_rule.iter_mut().find(|(rule, _)| *rule == fix.rule_id()) {
            Some((_, entries)) => entries.push((diagnostic, fix)),
            None => by_rule.push((fix.rule_id(), vec![(diagnostic, fix)])),
        }
    }

    let batches = fixes.batches(by_rule.iter().map(|(rule, _)| *rule));
    let comment = &settings.code_action.disable_rule_comment;
    let mut builder = ActionBuilder {
        document,
        cache,
        actions: Vec::new(),
    };

    for (rule, entries) in &by_rule {
        let rule: &str = rule;
        for &(diagnostic, fix) in entries {
            let args = builder.args(Some(rule)).for_diagnostic(&diagnostic.key());
            builder.push(
                fix.label().to_string(),
                APPLY_SINGLE_FIX,
                args,
                Some(diagnostic),
                fixes_edit(document, &[fix]),
            );
        }

        if comment.enable
            && let Some(&(diagnostic, fix)) = entries.first()
        {
            let edit = disable_line_edit(document, fix.line(), rule, comment);
            builder.push(
                format!("Disable {rule} for this line"),
                APPLY_DISABLE_LINE,
                builder.args(Some(rule)),
                Some(diagnostic),
                WorkspaceEdit::for_document(versioned(document), vec![edit]),
            );
        }

        let same_rule = batches.same_rule(rule);
        if same_rule.len() > 1 {
            builder.push(
                format!("Fix all {rule} problems"),
                APPLY_SAME_FIXES,
                builder.args(Some(rule)),
                None,
                fixes_edit(document, same_rule),
            );
        }

        if comment.enable {
            let edit = disable_file_edit(document, rule, comment);
            builder.push(
                format!("Disable {rule} for the entire file"),
                APPLY_DISABLE_FILE,
                builder.args(Some(rule)),
                None,
                WorkspaceEdit::for_document(versioned(document), vec![edit]),
            );
        }
    }

    if batches.all().len() > 1 {
        builder.push(
            FIX_ALL_TITLE.to_string(),
            APPLY_ALL_FIXES,
            builder.args(None),
            None,
            fixes_edit(document, batches.all()),
        );
    }

    builder.actions
}
