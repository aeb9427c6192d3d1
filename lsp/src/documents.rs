//! Open documents and their versions.
//!
//! Document sync is applied the moment a notification arrives, ahead of
//! anything queued, so the store is always the current truth that queued
//! work is checked against.

use std::collections::HashMap;

use lintel_types::{DocumentUri, DocumentVersion, Position, Range};

use crate::protocol::{TextDocumentContentChangeEvent, TextDocumentItem};

/// Lookup of a document's current version.
pub trait VersionRegistry {
    /// `None` when the document is not open.
    fn version(&self, uri: &DocumentUri) -> Option<DocumentVersion>;
}

/// Text of one open document plus a line index in UTF-16 code units.
#[derive(Debug, Clone)]
pub struct TextDocument {
    uri: DocumentUri,
    language_id: String,
    version: DocumentVersion,
    text: String,
    /// UTF-16 offset at which each line starts. Always starts with 0.
    line_starts: Vec<usize>,
    utf16_len: usize,
}

fn index_lines(text: &str) -> (Vec<usize>, usize) {
    let mut starts = vec![0];
    let mut offset = 0;
    for ch in text.chars() {
        offset += ch.len_utf16();
        if ch == '\n' {
            starts.push(offset);
        }
    }
    (starts, offset)
}

impl TextDocument {
    pub fn new(
        uri: DocumentUri,
        language_id: impl Into<String>,
        version: DocumentVersion,
        text: impl Into<String>,
    ) -> Self {
        let text = text.into();
        let (line_starts, utf16_len) = index_lines(&text);
        Self {
            uri,
            language_id: language_id.into(),
            version,
            text,
            line_starts,
            utf16_len,
        }
    }

    #[must_use]
    pub fn uri(&self) -> &DocumentUri {
        &self.uri
    }

    #[must_use]
    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    #[must_use]
    pub fn version(&self) -> DocumentVersion {
        self.version
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Position of a UTF-16 offset. Offsets past the end clamp to the end.
    #[must_use]
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.utf16_len);
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        Position::new(line as u32, (offset - self.line_starts[line]) as u32)
    }

    /// UTF-16 offset of a position. Characters past the end of a line clamp
    /// to just before its line break; lines past the end clamp to the end of
    /// the text.
    #[must_use]
    pub fn offset_at(&self, position: Position) -> usize {
        let Some(&start) = self.line_starts.get(position.line as usize) else {
            return self.utf16_len;
        };
        let width = self.line_end(position.line).character;
        start + position.character.min(width) as usize
    }

    fn byte_index(&self, utf16_offset: usize) -> usize {
        let mut units = 0;
        for (idx, ch) in self.text.char_indices() {
            if units >= utf16_offset {
                return idx;
            }
            units += ch.len_utf16();
        }
        self.text.len()
    }

    fn line_slice(&self, line: u32) -> &str {
        let line = line as usize;
        let Some(&start) = self.line_starts.get(line) else {
            return "";
        };
        let end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.utf16_len);
        &self.text[self.byte_index(start)..self.byte_index(end)]
    }

    /// Leading spaces and tabs of `line`.
    #[must_use]
    pub fn line_indentation(&self, line: u32) -> &str {
        let slice = self.line_slice(line);
        let content = slice.trim_start_matches([' ', '\t']);
        &slice[..slice.len() - content.len()]
    }

    /// Position just before the line break of `line`.
    #[must_use]
    pub fn line_end(&self, line: u32) -> Position {
        let content = self.line_slice(line).trim_end_matches(['\r', '\n']);
        let width: usize = content.chars().map(char::len_utf16).sum();
        Position::new(line, width as u32)
    }

    /// Apply one content change. A change without a range replaces the
    /// whole text.
    pub fn apply_change(&mut self, range: Option<Range>, text: &str) {
        match range {
            None => self.text = text.to_string(),
            Some(range) => {
                let start = self.byte_index(self.offset_at(range.start));
                let end = self.byte_index(self.offset_at(range.end)).max(start);
                self.text.replace_range(start..end, text);
            }
        }
        let (line_starts, utf16_len) = index_lines(&self.text);
        self.line_starts = line_starts;
        self.utf16_len = utf16_len;
    }
}

/// All documents the client currently has open.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: HashMap<DocumentUri, TextDocument>,
}

impl DocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, item: TextDocumentItem) -> &TextDocument {
        let document = TextDocument::new(item.uri, item.language_id, item.version, item.text);
        let uri = document.uri.clone();
        self.documents.insert(uri.clone(), document);
        &self.documents[&uri]
    }

    /// Apply changes and move the document to `version`.
    ///
    /// Returns `None` for documents that were never opened.
    pub fn change(
        &mut self,
        uri: &DocumentUri,
        version: DocumentVersion,
        changes: &[TextDocumentContentChangeEvent],
    ) -> Option<&TextDocument> {
        let document = self.documents.get_mut(uri)?;
        for change in changes {
            document.apply_change(change.range, &change.text);
        }
        document.version = version;
        Some(document)
    }

    pub fn close(&mut self, uri: &DocumentUri) -> Option<TextDocument> {
        self.documents.remove(uri)
    }

    #[must_use]
    pub fn get(&self, uri: &DocumentUri) -> Option<&TextDocument> {
        self.documents.get(uri)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TextDocument> {
        self.documents.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl VersionRegistry for DocumentStore {
    fn version(&self, uri: &DocumentUri) -> Option<DocumentVersion> {
        self.documents.get(uri).map(TextDocument::version)
    }
}
