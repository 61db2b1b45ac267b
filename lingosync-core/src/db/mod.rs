//! Snapshot persistence
//!
//! The editor state is stored as whole JSON blobs under string keys, in a
//! single SQLite table with embedded migrations.

pub mod schema;
mod store;

pub use store::{SnapshotStore, SqliteStore};
