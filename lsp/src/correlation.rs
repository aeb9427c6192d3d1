//! Correlation store: per-document map from diagnostic key to the fix the
//! lint backend proposed for it.
//!
//! Rewritten wholesale by each validation pass for its document, never
//! merged. Readers treat a missing entry as "no fixes available".

use std::collections::HashMap;

use lintel_types::{AutoFix, DiagnosticKey, DocumentUri};

/// One document's fixes, keyed by the diagnostic they belong to.
pub type FixMap = HashMap<DiagnosticKey, AutoFix>;

#[derive(Debug, Default)]
pub struct CorrelationStore {
    data: HashMap<DocumentUri, FixMap>,
}

impl CorrelationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one fix to a document's map, creating the map if needed.
    pub fn record(&mut self, uri: &DocumentUri, key: DiagnosticKey, fix: AutoFix) {
        self.data.entry(uri.clone()).or_default().insert(key, fix);
    }

    /// Install a complete map for a document, dropping whatever was there.
    ///
    /// An empty map removes the entry.
    pub fn replace(&mut self, uri: &DocumentUri, fixes: FixMap) {
        if fixes.is_empty() {
            self.data.remove(uri);
        } else {
            self.data.insert(uri.clone(), fixes);
        }
    }

    /// Forget a document's fixes (start of a validation pass, or close).
    pub fn clear(&mut self, uri: &DocumentUri) {
        self.data.remove(uri);
    }

    /// Take a document's fixes out of the store.
    pub fn remove(&mut self, uri: &DocumentUri) -> Option<FixMap> {
        self.data.remove(uri)
    }

    pub fn clear_all(&mut self) {
        self.data.clear();
    }

    #[must_use]
    pub fn get(&self, uri: &DocumentUri) -> Option<&FixMap> {
        self.data.get(uri)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
