//! Reconciliation of freshly fetched documents with an edited row table
//!
//! A fetch is a full resync to the remote source's key set: the table is
//! rebuilt in source order, keys missing from the source are dropped, and a
//! row whose target the user diverged from its baseline keeps that target.

use crate::codec::FlatDocument;
use crate::rows::{RowTable, TranslationRow};

/// Outcome counters of one reconciliation
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Rows in the new table
    pub rows: usize,
    /// Keys not present in the previous table
    pub added: usize,
    /// Local edits carried over verbatim
    pub preserved_edits: usize,
    /// Previous keys no longer in the source
    pub dropped: usize,
}

/// Merge fetched source/target leaves into a new table.
///
/// Pure function: the previous table is only read.
pub fn reconcile(
    existing: &RowTable,
    source: &FlatDocument,
    target: &FlatDocument,
) -> RowTable {
    reconcile_with_stats(existing, source, target).0
}

/// Same as [`reconcile`], also returning what changed
pub fn reconcile_with_stats(
    existing: &RowTable,
    source: &FlatDocument,
    target: &FlatDocument,
) -> (RowTable, ReconcileStats) {
    let mut table = RowTable::new();
    let mut stats = ReconcileStats::default();

    for (key, value) in source.iter() {
        // Only string leaves are translatable
        let Some(source_value) = value.as_str() else {
            continue;
        };

        let original = target
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(source_value)
            .to_string();

        let row = match existing.get(key) {
            None => {
                stats.added += 1;
                TranslationRow::new(key, source_value, original)
            }
            Some(prev) => {
                let target_value = if prev.is_modified() {
                    stats.preserved_edits += 1;
                    prev.target_value.clone()
                } else {
                    original.clone()
                };
                TranslationRow {
                    key: key.to_string(),
                    source_value: source_value.to_string(),
                    target_value,
                    original_target_value: original,
                    ai_suggestion: prev.ai_suggestion.clone(),
                }
            }
        };
        table.push(row);
    }

    stats.rows = table.len();
    stats.dropped = existing
        .iter()
        .filter(|r| table.get(&r.key).is_none())
        .count();

    tracing::debug!(
        rows = stats.rows,
        added = stats.added,
        preserved_edits = stats.preserved_edits,
        dropped = stats.dropped,
        "Reconciled row table"
    );

    (table, stats)
}
