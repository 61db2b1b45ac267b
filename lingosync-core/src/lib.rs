//! # lingosync-core
//!
//! Core library for lingosync, a localization-file editor.
//!
//! This library provides:
//! - A lossless codec between nested locale documents and flat leaf tables
//! - Reconciliation of freshly fetched source/target files with local edits
//! - A small tag/regex query language over translation rows
//! - Batched AI suggestion requests with per-row in-flight tracking
//! - Snapshot storage, configuration and logging
//!
//! ## Example
//!
//! ```rust
//! use lingosync_core::{codec, reconcile, Document, Query, RowTable};
//!
//! let source = Document::from_json_str(r#"{"a": {"b": "Hello"}}"#).unwrap();
//! let target = Document::from_json_str(r#"{"a": {"b": "Bonjour"}}"#).unwrap();
//!
//! let table = reconcile(
//!     &RowTable::new(),
//!     &codec::flatten(&source),
//!     &codec::flatten(&target),
//! );
//! assert_eq!(table.get("a.b").unwrap().target_value, "Bonjour");
//!
//! let in_flight = lingosync_core::suggest::InFlightSet::new();
//! let hits = Query::parse("#done").filter(table.rows(), &in_flight);
//! assert_eq!(hits.len(), 1);
//! ```

// Re-export commonly used items at the crate root
pub use codec::{flatten, unflatten, FlatDocument, LeafPath};
pub use config::Config;
pub use db::{SnapshotStore, SqliteStore};
pub use document::{Document, Scalar};
pub use error::{Error, Result};
pub use model::AiModel;
pub use project::{import_project, Project, RepoConfig};
pub use query::{Clause, Query, Tag};
pub use reconcile::{reconcile, reconcile_with_stats, ReconcileStats};
pub use remote::{DocumentRemote, LocalRemote, Revision};
pub use rows::{RowField, RowTable, TranslationRow};
pub use state::{AppState, Settings, StateHandle};
pub use suggest::{BatchReport, SuggestionBatcher};

// Public modules
pub mod codec;
pub mod config;
pub mod db;
pub mod document;
pub mod error;
pub mod logging;
pub mod model;
pub mod project;
pub mod query;
pub mod reconcile;
pub mod remote;
pub mod rows;
pub mod state;
pub mod suggest;
pub mod sync;
