//! Fixes engine: turns one document's recorded fixes into batches of
//! edits that can be applied together.
//!
//! Lint rules propose fixes independently and in rule-evaluation order, so
//! fixes routinely overlap. Everything here works on a sorted view and a
//! greedy left-to-right scan: the earliest-starting fix wins, and a later
//! fix is kept only if it starts at or after the end of the last one kept.

use std::cmp::Ordering;

use lintel_types::{AutoFix, Diagnostic, DocumentVersion};
use thiserror::Error;

use crate::correlation::FixMap;

/// A version was asked of a snapshot with no fixes in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no fixes recorded for this document")]
pub struct EmptyCollection;

/// Read-only view over one document's fixes.
#[derive(Debug, Clone, Copy)]
pub struct Fixes<'a> {
    edits: &'a FixMap,
}

/// Sort order: start ascending; among equal starts a fix ending at offset
/// zero comes first, then end ascending. Rule id and replacement text break
/// the remaining ties so the order does not depend on map iteration.
fn sort_key(fix: &AutoFix) -> (usize, bool, usize, &str, &str) {
    let range = fix.range();
    (
        range.start,
        range.end != 0,
        range.end,
        fix.rule_id(),
        fix.edit().text.as_str(),
    )
}

fn compare(a: &AutoFix, b: &AutoFix) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

impl<'a> Fixes<'a> {
    #[must_use]
    pub fn new(edits: &'a FixMap) -> Self {
        Self { edits }
    }

    /// Whether `candidate` collides with the last accepted fix.
    #[must_use]
    pub fn overlaps(last: Option<&AutoFix>, candidate: &AutoFix) -> bool {
        last.is_some_and(|last| last.range().overlaps_next(&candidate.range()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// The version every fix in this snapshot was computed against.
    pub fn document_version(&self) -> Result<DocumentVersion, EmptyCollection> {
        self.edits
            .values()
            .next()
            .map(AutoFix::document_version)
            .ok_or(EmptyCollection)
    }

    /// Fixes for exactly these diagnostics, paired with the diagnostic and
    /// in the order given. Diagnostics without a recorded fix are skipped.
    #[must_use]
    pub fn scoped<'d>(&self, diagnostics: &'d [Diagnostic]) -> Vec<(&'d Diagnostic, &'a AutoFix)> {
        diagnostics
            .iter()
            .filter_map(|diagnostic| {
                self.edits
                    .get(&diagnostic.key())
                    .map(|fix| (diagnostic, fix))
            })
            .collect()
    }

    #[must_use]
    pub fn all_sorted(&self) -> Vec<&'a AutoFix> {
        let mut sorted: Vec<&'a AutoFix> = self.edits.values().collect();
        sorted.sort_by(|a, b| compare(a, b));
        sorted
    }

    /// A maximal set of pairwise non-overlapping fixes, sorted by start.
    #[must_use]
    pub fn overlap_free(&self) -> Vec<&'a AutoFix> {
        let mut result: Vec<&'a AutoFix> = Vec::new();
        for fix in self.all_sorted() {
            if !Self::overlaps(result.last().copied(), fix) {
                result.push(fix);
            }
        }
        result
    }

    /// One scan building a non-overlapping batch per requested rule and one
    /// across all rules. Each batch tests overlap against its own last
    /// accepted fix only.
    #[must_use]
    pub fn batches<'r>(&self, rule_ids: impl IntoIterator<Item = &'r str>) -> FixBatches<'a> {
        let mut same_rule: Vec<(String, Vec<&'a AutoFix>)> = Vec::new();
        for rule in rule_ids {
            if !same_rule.iter().any(|(seen, _)| seen == rule) {
                same_rule.push((rule.to_string(), Vec::new()));
            }
        }

        let mut all: Vec<&'a AutoFix> = Vec::new();
        for fix in self.all_sorted() {
            if let Some((_, batch)) = same_rule
                .iter_mut()
                .find(|(rule, _)| rule == fix.rule_id())
                && !Self::overlaps(batch.last().copied(), fix)
            {
                batch.push(fix);
            }
            if !Self::overlaps(all.last().copied(), fix) {
                all.push(fix);
            }
        }

        FixBatches { same_rule, all }
    }
}

/// Output of [`Fixes::batches`].
#[derive(Debug, Clone, Default)]
pub struct FixBatches<'a> {
    same_rule: Vec<(String, Vec<&'a AutoFix>)>,
    all: Vec<&'a AutoFix>,
}

impl<'a> FixBatches<'a> {
    /// Batch for `rule`; empty for rules that were not requested.
    #[must_use]
    pub fn same_rule(&self, rule: &str) -> &[&'a AutoFix] {
        self.same_rule
            .iter()
            .find(|(r, _)| r == rule)
            .map_or(&[], |(_, batch)| batch.as_slice())
    }

    /// Requested rules with their batches, in request order.
    pub fn rules(&self) -> impl Iterator<Item = (&str, &[&'a AutoFix])> {
        self.same_rule
            .iter()
            .map(|(rule, batch)| (rule.as_str(), batch.as_slice()))
    }

    #[must_use]
    pub fn all(&self) -> &[&'a AutoFix] {
        &self.all
    }
}
