//! Translation rows and the ordered row table

use crate::codec::{FlatDocument, LeafPath};
use crate::document::Scalar;
use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// One translatable string, identified by its leaf path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRow {
    pub key: LeafPath,
    /// Latest fetched source string
    pub source_value: String,
    /// Current editable value
    pub target_value: String,
    /// Last value known to match the remote target document
    pub original_target_value: String,
    /// Last AI candidate, empty if none
    #[serde(default)]
    pub ai_suggestion: String,
}

impl TranslationRow {
    /// A fresh row whose target mirrors the original
    pub fn new(
        key: impl Into<LeafPath>,
        source_value: impl Into<String>,
        original_target_value: impl Into<String>,
    ) -> Self {
        let original = original_target_value.into();
        Self {
            key: key.into(),
            source_value: source_value.into(),
            target_value: original.clone(),
            original_target_value: original,
            ai_suggestion: String::new(),
        }
    }

    /// The user diverged the target from the remote baseline
    pub fn is_modified(&self) -> bool {
        self.target_value != self.original_target_value
    }

    /// Translation was needed and the untouched target already resolves it
    pub fn is_done(&self) -> bool {
        self.source_value != self.original_target_value
            && self.target_value == self.original_target_value
    }

    /// Target still mirrors the source or is empty
    pub fn is_undone(&self) -> bool {
        self.source_value == self.target_value || self.target_value.is_empty()
    }

    pub fn has_suggestion(&self) -> bool {
        !self.ai_suggestion.is_empty()
    }
}

/// Which editable field of a row to update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowField {
    Target,
    Suggestion,
}

/// Ordered collection of rows, unique by key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowTable {
    rows: Vec<TranslationRow>,
    index: HashMap<LeafPath, usize>,
}

impl RowTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from rows. A repeated key replaces the earlier row but
    /// keeps its first position.
    pub fn from_rows(rows: impl IntoIterator<Item = TranslationRow>) -> Self {
        let mut table = RowTable::new();
        for row in rows {
            table.push(row);
        }
        table
    }

    pub(crate) fn push(&mut self, row: TranslationRow) {
        match self.index.get(&row.key) {
            Some(&i) => self.rows[i] = row,
            None => {
                self.index.insert(row.key.clone(), self.rows.len());
                self.rows.push(row);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&TranslationRow> {
        self.index.get(key).map(|&i| &self.rows[i])
    }

    fn get_mut(&mut self, key: &str) -> Result<&mut TranslationRow> {
        match self.index.get(key) {
            Some(&i) => Ok(&mut self.rows[i]),
            None => Err(Error::RowNotFound(key.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TranslationRow> {
        self.rows.iter()
    }

    pub fn rows(&self) -> &[TranslationRow] {
        &self.rows
    }

    /// Overwrite one editable field of a row
    pub fn set_field(&mut self, key: &str, field: RowField, value: impl Into<String>) -> Result<()> {
        let row = self.get_mut(key)?;
        match field {
            RowField::Target => row.target_value = value.into(),
            RowField::Suggestion => row.ai_suggestion = value.into(),
        }
        Ok(())
    }

    pub fn set_target(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        self.set_field(key, RowField::Target, value)
    }

    pub fn set_suggestion(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        self.set_field(key, RowField::Suggestion, value)
    }

    /// Copy the AI suggestion into the target. Returns false when there is
    /// no suggestion to commit.
    pub fn commit_suggestion(&mut self, key: &str) -> Result<bool> {
        let row = self.get_mut(key)?;
        if row.ai_suggestion.is_empty() {
            return Ok(false);
        }
        row.target_value = row.ai_suggestion.clone();
        Ok(true)
    }

    pub fn discard_suggestion(&mut self, key: &str) -> Result<()> {
        self.get_mut(key)?.ai_suggestion.clear();
        Ok(())
    }

    /// Drop a local edit, restoring the remote baseline
    pub fn revert(&mut self, key: &str) -> Result<()> {
        let row = self.get_mut(key)?;
        row.target_value = row.original_target_value.clone();
        Ok(())
    }

    /// Adopt the committed targets as the new baseline.
    ///
    /// `committed` is the [`target_entries`](Self::target_entries) snapshot
    /// that was pushed. Only those values become baselines, so a row edited
    /// after the snapshot stays modified. Returns how many baselines moved.
    pub fn mark_committed(&mut self, committed: &FlatDocument) -> usize {
        let mut moved = 0;
        for row in &mut self.rows {
            let Some(Scalar::String(value)) = committed.get(&row.key) else {
                continue;
            };
            if row.original_target_value != *value {
                row.original_target_value = value.clone();
                moved += 1;
            }
        }
        moved
    }

    pub fn modified_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_modified()).count()
    }

    /// Target values as a flat table, ready to unflatten into a document
    pub fn target_entries(&self) -> FlatDocument {
        self.rows
            .iter()
            .map(|r| (r.key.clone(), Scalar::String(r.target_value.clone())))
            .collect()
    }
}

impl Serialize for RowTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.rows.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RowTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Vec::<TranslationRow>::deserialize(deserializer).map(RowTable::from_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RowTable {
        RowTable::from_rows(vec![
            TranslationRow::new("a.b", "Hello", "Bonjour"),
            TranslationRow::new("a.c", "Bye", "Bye"),
        ])
    }

    #[test]
    fn test_row_state_predicates() {
        let mut t = table();
        let row = t.get("a.b").unwrap();
        assert!(row.is_done());
        assert!(!row.is_modified());
        assert!(t.get("a.c").unwrap().is_undone());

        t.set_target("a.b", "Salut").unwrap();
        let row = t.get("a.b").unwrap();
        assert!(row.is_modified());
        assert!(!row.is_done());
        assert_eq!(t.modified_count(), 1);
    }

    #[test]
    fn test_unknown_key_is_error() {
        let mut t = table();
        assert!(matches!(
            t.set_target("missing", "x"),
            Err(Error::RowNotFound(_))
        ));
    }

    #[test]
    fn test_commit_and_discard_suggestion() {
        let mut t = table();
        assert!(!t.commit_suggestion("a.c").unwrap());

        t.set_suggestion("a.c", "Au revoir").unwrap();
        assert!(t.commit_suggestion("a.c").unwrap());
        let row = t.get("a.c").unwrap();
        assert_eq!(row.target_value, "Au revoir");
        assert_eq!(row.ai_suggestion, "Au revoir");

        t.discard_suggestion("a.c").unwrap();
        assert!(!t.get("a.c").unwrap().has_suggestion());
        assert_eq!(t.get("a.c").unwrap().target_value, "Au revoir");
    }

    #[test]
    fn test_revert_and_mark_committed() {
        let mut t = table();
        t.set_target("a.b", "Salut").unwrap();
        t.revert("a.b").unwrap();
        assert_eq!(t.modified_count(), 0);

        t.set_target("a.b", "Salut").unwrap();
        assert_eq!(t.mark_committed(&t.target_entries()), 1);
        assert_eq!(t.modified_count(), 0);
        assert_eq!(t.get("a.b").unwrap().original_target_value, "Salut");
    }

    #[test]
    fn test_mark_committed_keeps_later_edits_modified() {
        let mut t = table();
        t.set_target("a.b", "Salut").unwrap();
        let pushed = t.target_entries();
        t.set_target("a.c", "Au revoir").unwrap();
        t.set_target("a.b", "Coucou").unwrap();

        assert_eq!(t.mark_committed(&pushed), 1);
        let b = t.get("a.b").unwrap();
        assert_eq!(b.original_target_value, "Salut");
        assert!(b.is_modified());
        let c = t.get("a.c").unwrap();
        assert_eq!(c.original_target_value, "Bye");
        assert!(c.is_modified());
    }

    #[test]
    fn test_duplicate_keys_keep_first_position() {
        let t = RowTable::from_rows(vec![
            TranslationRow::new("x", "1", "1"),
            TranslationRow::new("y", "2", "2"),
            TranslationRow::new("x", "3", "3"),
        ]);
        let keys: Vec<_> = t.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["x", "y"]);
        assert_eq!(t.get("x").unwrap().source_value, "3");
    }

    #[test]
    fn test_serializes_as_row_array() {
        let t = table();
        let json = serde_json::to_value(&t).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["key"], "a.b");
        assert_eq!(json[0]["originalTargetValue"], "Bonjour");

        let back: RowTable = serde_json::from_value(json).unwrap();
        assert_eq!(back, t);
    }
}
