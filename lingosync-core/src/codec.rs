//! Path codec: nested documents <-> flat leaf tables
//!
//! [`flatten`] walks a [`Document`] depth-first and emits one entry per scalar
//! leaf, keyed by its dotted [`LeafPath`]. [`unflatten`] rebuilds a document
//! from such a table, optionally on top of a base document whose shape
//! (including empty containers) is kept.
//!
//! ## Path format
//!
//! Segments are joined with `.`. Array indices are plain decimal numbers.
//! A `.` or `\` inside an object key is escaped with a backslash, so
//! `{"a.b": {"c": "x"}}` flattens to `a\.b.c` and splits back into the
//! exact segments `["a.b", "c"]`.

use crate::document::{Document, Scalar};
use crate::error::{Error, Result};
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// Dotted address of one scalar leaf, e.g. `auth.errors.0.message`
pub type LeafPath = String;

/// Largest run of `null` padding a single leaf may add to an array
pub const MAX_ARRAY_GAP: usize = 10_000;

/// Ordered mapping of leaf paths to scalar values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatDocument {
    entries: Vec<(LeafPath, Scalar)>,
    index: HashMap<LeafPath, usize>,
}

impl FlatDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a leaf. Re-inserting an existing path overwrites it in place.
    pub fn insert(&mut self, path: impl Into<LeafPath>, value: Scalar) {
        let path = path.into();
        match self.index.get(&path) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(path.clone(), self.entries.len());
                self.entries.push((path, value));
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&Scalar> {
        self.index.get(path).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in traversal order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(LeafPath, Scalar)> for FlatDocument {
    fn from_iter<I: IntoIterator<Item = (LeafPath, Scalar)>>(iter: I) -> Self {
        let mut flat = FlatDocument::new();
        for (path, value) in iter {
            flat.insert(path, value);
        }
        flat
    }
}

impl Serialize for FlatDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (path, value) in &self.entries {
            map.serialize_entry(path, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FlatDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let map = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut flat = FlatDocument::new();
        for (path, value) in map {
            if value.is_object() || value.is_array() {
                return Err(D::Error::custom(format!(
                    "leaf `{path}` must be a scalar value"
                )));
            }
            let scalar = Scalar::deserialize(value).map_err(D::Error::custom)?;
            flat.insert(path, scalar);
        }
        Ok(flat)
    }
}

/// Flatten a document into its scalar leaves.
///
/// Containers are never emitted; empty objects and arrays contribute nothing.
/// A scalar root has no addressable leaf and yields an empty table.
pub fn flatten(document: &Document) -> FlatDocument {
    let mut flat = FlatDocument::new();
    let mut segments = Vec::new();
    walk(document, &mut segments, &mut flat);
    flat
}

fn walk(node: &Document, segments: &mut Vec<String>, out: &mut FlatDocument) {
    match node {
        Document::Object(entries) => {
            for (key, child) in entries {
                segments.push(key.clone());
                walk(child, segments, out);
                segments.pop();
            }
        }
        Document::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                segments.push(i.to_string());
                walk(child, segments, out);
                segments.pop();
            }
        }
        Document::Scalar(value) => {
            if !segments.is_empty() {
                out.insert(join_path(segments), value.clone());
            }
        }
    }
}

/// Rebuild a document from a flat table.
///
/// Starts from a copy of `base` (or an empty object). Existing containers
/// keep their kind; missing intermediates become arrays when the following
/// segment is an array index and objects otherwise. Leaves overwrite whatever
/// `base` held at that position.
pub fn unflatten(flat: &FlatDocument, base: Option<&Document>) -> Result<Document> {
    let mut root = base.cloned().unwrap_or_default();

    for (path, value) in flat.iter() {
        assign(&mut root, path, value.clone())?;
    }

    Ok(root)
}

fn assign(root: &mut Document, path: &str, value: Scalar) -> Result<()> {
    if !root.is_container() {
        return Err(Error::structural(
            path,
            "cannot address a leaf inside a scalar document root",
        ));
    }

    let segments = split_path(path);
    let mut node = root;

    for (i, segment) in segments.iter().enumerate() {
        let slot = child_slot(node, segment, path)?;

        if i + 1 == segments.len() {
            *slot = Document::Scalar(value);
            return Ok(());
        }

        if !slot.is_container() {
            *slot = if is_index(&segments[i + 1]) {
                Document::Array(Vec::new())
            } else {
                Document::Object(Vec::new())
            };
        }
        node = slot;
    }

    Ok(())
}

/// Returns the child at `segment`, creating a null placeholder if missing.
fn child_slot<'a>(node: &'a mut Document, segment: &str, path: &str) -> Result<&'a mut Document> {
    match node {
        Document::Object(entries) => {
            let pos = match entries.iter().position(|(k, _)| k == segment) {
                Some(pos) => pos,
                None => {
                    entries.push((segment.to_string(), Document::Scalar(Scalar::Null)));
                    entries.len() - 1
                }
            };
            Ok(&mut entries[pos].1)
        }
        Document::Array(items) => {
            let index = parse_index(segment).ok_or_else(|| {
                Error::structural(path, format!("segment `{segment}` is not an array index"))
            })?;
            if index >= items.len() {
                let len = index
                    .checked_add(1)
                    .filter(|&len| len - items.len() <= MAX_ARRAY_GAP)
                    .ok_or_else(|| {
                        Error::structural(
                            path,
                            format!(
                                "index {index} is too far past the end of an array of {}",
                                items.len()
                            ),
                        )
                    })?;
                items.resize(len, Document::Scalar(Scalar::Null));
            }
            Ok(&mut items[index])
        }
        Document::Scalar(_) => Err(Error::structural(
            path,
            format!("segment `{segment}` addresses into a scalar"),
        )),
    }
}

/// Whether a segment looks like an array index
pub fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

fn parse_index(segment: &str) -> Option<usize> {
    if is_index(segment) {
        segment.parse().ok()
    } else {
        None
    }
}

/// Join raw segments into a leaf path, escaping `.` and `\`
pub fn join_path<S: AsRef<str>>(segments: &[S]) -> LeafPath {
    segments
        .iter()
        .map(|s| escape_segment(s.as_ref()))
        .collect::<Vec<_>>()
        .join(".")
}

fn escape_segment(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for ch in segment.chars() {
        if ch == '.' || ch == '\\' {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Split a leaf path back into its raw segments
pub fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => current.push(chars.next().unwrap_or('\\')),
            '.' => segments.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    segments.push(current);

    segments
}

/// Final raw segment of a leaf path
pub fn last_segment(path: &str) -> String {
    split_path(path).pop().unwrap_or_default()
}
