//! Row search queries
//!
//! A query is a list of clauses separated by `||`; a row matches when any
//! clause matches. A clause is a free-text term followed by optional tags:
//!
//! ```text
//! login #key || #modified #ai || ^err.*(\d+)$ #reg
//! ```
//!
//! | Tag | Row predicate |
//! |-----|---------------|
//! | `#reg` | text term is a regular expression |
//! | `#key` | text term is matched against the key only |
//! | `#modified` | target differs from the remote baseline |
//! | `#done` | source differs from baseline and target is untouched |
//! | `#undone` | target equals source, or is empty |
//! | `#doing` | `#undone` or `#modified` |
//! | `#ai` / `#noai` | has / has no AI suggestion |
//! | `#empty` | target is empty |
//! | `#inarray` | last key segment is an array index |
//! | `#aifetching` | a suggestion request is in flight |
//!
//! Text and tags within one clause are ANDed. Matching is case-insensitive.

use crate::codec::{is_index, last_segment};
use crate::error::Error;
use crate::rows::TranslationRow;
use crate::suggest::InFlightSet;
use regex::{Regex, RegexBuilder};

/// A recognized query tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Reg,
    Key,
    Modified,
    Done,
    Undone,
    Doing,
    Ai,
    NoAi,
    Empty,
    InArray,
    AiFetching,
}

impl Tag {
    /// Parse a tag name (without `#`), case-insensitively
    pub fn parse(name: &str) -> Option<Tag> {
        let tag = match name.to_ascii_lowercase().as_str() {
            "reg" => Tag::Reg,
            "key" => Tag::Key,
            "modified" => Tag::Modified,
            "done" => Tag::Done,
            "undone" => Tag::Undone,
            "doing" => Tag::Doing,
            "ai" => Tag::Ai,
            "noai" => Tag::NoAi,
            "empty" => Tag::Empty,
            "inarray" => Tag::InArray,
            "aifetching" => Tag::AiFetching,
            _ => return None,
        };
        Some(tag)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Reg => "reg",
            Tag::Key => "key",
            Tag::Modified => "modified",
            Tag::Done => "done",
            Tag::Undone => "undone",
            Tag::Doing => "doing",
            Tag::Ai => "ai",
            Tag::NoAi => "noai",
            Tag::Empty => "empty",
            Tag::InArray => "inarray",
            Tag::AiFetching => "aifetching",
        }
    }

    /// Row-state predicate of this tag. Text modifiers always hold.
    fn holds(&self, row: &TranslationRow, in_flight: &InFlightSet) -> bool {
        match self {
            Tag::Reg | Tag::Key => true,
            Tag::Modified => row.is_modified(),
            Tag::Done => row.is_done(),
            Tag::Undone => row.is_undone(),
            Tag::Doing => row.is_undone() || row.is_modified(),
            Tag::Ai => row.has_suggestion(),
            Tag::NoAi => !row.has_suggestion(),
            Tag::Empty => row.target_value.is_empty(),
            Tag::InArray => is_index(&last_segment(&row.key)),
            Tag::AiFetching => in_flight.contains(&row.key),
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
enum TextMatcher {
    Substring(String),
    Pattern(Regex),
    /// `#reg` term that failed to compile; the clause never matches
    Invalid { pattern: String, message: String },
}

/// One OR-branch of a query
#[derive(Debug, Clone)]
pub struct Clause {
    text: String,
    tags: Vec<Tag>,
    matcher: TextMatcher,
}

impl Clause {
    /// Parse one clause. Never fails: an invalid `#reg` pattern is kept as
    /// a clause that matches nothing.
    pub fn parse(raw: &str) -> Self {
        let (text, tag_part) = match raw.find('#') {
            Some(i) => raw.split_at(i),
            None => (raw, ""),
        };
        let term = text.trim();
        let text = term.to_lowercase();

        let mut tags = Vec::new();
        for word in tag_part.split_whitespace() {
            if !word.starts_with('#') {
                continue;
            }
            for name in word.split('#').filter(|n| !n.is_empty()) {
                match Tag::parse(name) {
                    Some(tag) if !tags.contains(&tag) => tags.push(tag),
                    Some(_) => {}
                    None => tracing::debug!(tag = name, "Ignoring unknown query tag"),
                }
            }
        }

        let matcher = if tags.contains(&Tag::Reg) {
            // Compiled from the original-case term so escapes like `\D` keep
            // their meaning; matching is still case-insensitive.
            match RegexBuilder::new(term).case_insensitive(true).build() {
                Ok(re) => TextMatcher::Pattern(re),
                Err(e) => {
                    tracing::debug!(pattern = %term, error = %e, "Invalid query pattern");
                    TextMatcher::Invalid {
                        pattern: term.to_string(),
                        message: e.to_string(),
                    }
                }
            }
        } else {
            TextMatcher::Substring(text.clone())
        };

        Self {
            text,
            tags,
            matcher,
        }
    }

    /// Normalized free-text term
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    /// The compile error of an invalid `#reg` term
    pub fn pattern_error(&self) -> Option<Error> {
        match &self.matcher {
            TextMatcher::Invalid { pattern, message } => Some(Error::Pattern {
                pattern: pattern.clone(),
                message: message.clone(),
            }),
            _ => None,
        }
    }

    pub fn matches(&self, row: &TranslationRow, in_flight: &InFlightSet) -> bool {
        self.text_matches(row) && self.tags.iter().all(|tag| tag.holds(row, in_flight))
    }

    fn text_matches(&self, row: &TranslationRow) -> bool {
        let all = [
            row.key.as_str(),
            row.source_value.as_str(),
            row.target_value.as_str(),
        ];
        let fields = if self.has_tag(Tag::Key) {
            &all[..1]
        } else {
            &all[..]
        };

        match &self.matcher {
            TextMatcher::Substring(text) => {
                text.is_empty() || fields.iter().any(|f| f.to_lowercase().contains(text))
            }
            TextMatcher::Pattern(re) => fields.iter().any(|f| re.is_match(f)),
            TextMatcher::Invalid { .. } => false,
        }
    }
}

/// A parsed search query
#[derive(Debug, Clone, Default)]
pub struct Query {
    clauses: Vec<Clause>,
}

impl Query {
    /// Parse a raw query string. A blank query matches every row.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        Self {
            clauses: raw.split("||").map(Clause::parse).collect(),
        }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Errors of clauses whose `#reg` pattern failed to compile
    pub fn pattern_errors(&self) -> Vec<Error> {
        self.clauses
            .iter()
            .filter_map(Clause::pattern_error)
            .collect()
    }

    pub fn matches(&self, row: &TranslationRow, in_flight: &InFlightSet) -> bool {
        self.clauses.is_empty() || self.clauses.iter().any(|c| c.matches(row, in_flight))
    }

    /// Matching rows, in table order
    pub fn filter<'a, I>(&self, rows: I, in_flight: &InFlightSet) -> Vec<&'a TranslationRow>
    where
        I: IntoIterator<Item = &'a TranslationRow>,
    {
        rows.into_iter()
            .filter(|row| self.matches(row, in_flight))
            .collect()
    }
}
