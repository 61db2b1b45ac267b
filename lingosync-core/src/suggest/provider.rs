//! Suggestion provider contract
//!
//! The provider is an external collaborator (typically an HTTP call to a
//! generative model). It may return a partial mapping; a key missing from the
//! response means "no suggestion" rather than an error. A failure is reported
//! once for the whole call.

use crate::error::Result;
use crate::model::AiModel;
use crate::rows::{RowTable, TranslationRow};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

/// Suggested strings keyed by row key
pub type SuggestionMap = HashMap<String, String>;

/// One string to translate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionItem {
    pub key: String,
    pub value: String,
}

impl From<&TranslationRow> for SuggestionItem {
    fn from(row: &TranslationRow) -> Self {
        Self {
            key: row.key.clone(),
            value: row.source_value.clone(),
        }
    }
}

/// Everything the provider needs for one call
#[derive(Debug, Clone)]
pub struct SuggestionRequest {
    pub model: AiModel,
    pub api_key: String,
    pub source_lang: String,
    pub target_lang: String,
    pub items: Vec<SuggestionItem>,
    pub extra_instructions: String,
}

/// Produces translation candidates for a batch of strings
pub trait SuggestionProvider: Send + Sync {
    fn suggest(
        &self,
        request: &SuggestionRequest,
    ) -> impl Future<Output = Result<SuggestionMap>> + Send;
}

/// Destination for suggestions produced by a batch
pub trait SuggestionSink {
    /// Store a suggestion on a row. Returns false if the row no longer exists.
    fn apply_suggestion(&self, key: &str, suggestion: &str) -> bool;
}

impl SuggestionSink for Mutex<RowTable> {
    fn apply_suggestion(&self, key: &str, suggestion: &str) -> bool {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_suggestion(key, suggestion)
            .is_ok()
    }
}
