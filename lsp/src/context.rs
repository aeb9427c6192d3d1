//! State owned by the server loop.
//!
//! One `ServerContext` lives for the whole session. Only the loop and the
//! handlers it dispatches touch it, one message at a time.

use std::path::Path;
use std::sync::Arc;

use lintel_types::{DocumentUri, DocumentVersion};

use crate::client::ClientHandle;
use crate::commands::CommandCache;
use crate::correlation::{CorrelationStore, FixMap};
use crate::documents::DocumentStore;
use crate::linter::{LintRequest, Linter};
use crate::protocol::file_uri_to_path;
use crate::report::{ErrorReporter, Status};
use crate::settings::Settings;

const DEFAULT_SOURCE: &str = "lintel";

pub struct ServerContext {
    pub(crate) documents: DocumentStore,
    pub(crate) correlation: CorrelationStore,
    pub(crate) commands: CommandCache,
    pub(crate) settings: Settings,
    pub(crate) reporter: ErrorReporter,
    pub(crate) linter: Arc<dyn Linter>,
    pub(crate) client: ClientHandle,
    status: Option<Status>,
}

impl ServerContext {
    pub(crate) fn new(linter: Arc<dyn Linter>, client: ClientHandle) -> Self {
        Self {
            documents: DocumentStore::new(),
            correlation: CorrelationStore::new(),
            commands: CommandCache::new(),
            settings: Settings::default(),
            reporter: ErrorReporter::new(),
            linter,
            client,
            status: None,
        }
    }

    #[must_use]
    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    #[must_use]
    pub fn correlation(&self) -> &CorrelationStore {
        &self.correlation
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// `source` of published diagnostics: the linter executable's name.
    fn diagnostic_source(&self) -> String {
        Path::new(&self.settings.linter.command)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .unwrap_or(DEFAULT_SOURCE)
            .to_string()
    }

    fn set_status(&mut self, status: Status) {
        if self.status != Some(status) {
            self.status = Some(status);
            self.client.send_status(status);
        }
    }

    /// One validation pass.
    ///
    /// The document's fixes are dropped first and the complete new set is
    /// installed before diagnostics go out, so a code-action request never
    /// sees a half-built map. On backend failure the entry stays empty and
    /// the document's diagnostics are cleared.
    pub(crate) fn validate(&mut self, uri: &DocumentUri) {
        self.correlation.clear(uri);

        let Some(document) = self.documents.get(uri) else {
            return;
        };
        let version = document.version();

        if !self.settings.validate {
            self.client.publish_diagnostics(uri, Some(version), Vec::new());
            return;
        }

        let path = file_uri_to_path(uri);
        let request = LintRequest {
            uri,
            path: path.as_deref(),
            language_id: document.language_id(),
            text: document.text(),
            config: &self.settings.linter,
        };

        match self.linter.lint(&request) {
            Ok(findings) => {
                let source = self.diagnostic_source();
                let mut fixes = FixMap::new();
                let mut diagnostics = Vec::with_capacity(findings.len());
                for finding in &findings {
                    if self.settings.quiet && finding.is_warning() {
                        continue;
                    }
                    let diagnostic = finding.to_diagnostic(&source);
                    if let Some(fix) = finding.to_auto_fix(version) {
                        fixes.insert(diagnostic.key(), fix);
                    }
                    diagnostics.push(diagnostic);
                }

                tracing::debug!(
                    %uri,
                    %version,
                    diagnostics = diagnostics.len(),
                    fixes = fixes.len(),
                    "validated"
                );
                self.correlation.replace(uri, fixes);
                self.set_status(Status::Ok);
                self.client
                    .publish_diagnostics(uri, Some(version), diagnostics);
            }
            Err(err) => {
                let report = self.reporter.report(uri, &err);
                self.client.log_message(report.log);
                if let Some(show) = report.show {
                    self.client.show_message(show);
                }
                self.set_status(report.status);
                self.client.publish_diagnostics(uri, Some(version), Vec::new());
            }
        }
    }

    /// Forget everything derived from a closed document.
    pub(crate) fn document_closed(&mut self, uri: &DocumentUri) {
        self.documents.close(uri);
        if let Some(fixes) = self.correlation.remove(uri) {
            tracing::trace!(%uri, fixes = fixes.len(), "dropping fixes of closed document");
        }
        self.commands.clear();
        self.client.publish_diagnostics(uri, None, Vec::new());
    }

    /// Settings or watched configuration files changed. Derived state is
    /// dropped and every open document is returned for revalidation.
    pub(crate) fn environment_changed(&mut self) -> Vec<(DocumentUri, DocumentVersion)> {
        self.reporter.reset();
        self.commands.clear();
        self.correlation.clear_all();
        self.status = None;

        let mut open: Vec<(DocumentUri, DocumentVersion)> = self
            .documents
            .iter()
            .map(|doc| (doc.uri().clone(), doc.version()))
            .collect();
        open.sort();
        open
    }
}
