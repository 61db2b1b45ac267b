//! Document remotes
//!
//! A remote hosts the source and target locale files. Commits are
//! optimistic: the caller passes the revision it last saw and the remote
//! refuses the write if the file moved in between.

use crate::document::Document;
use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fmt;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Opaque revision marker of a remote file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(pub String);

impl Revision {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote holding locale documents
pub trait DocumentRemote: Send + Sync {
    /// Fetch and parse a document. Missing files are [`Error::NotFound`].
    fn fetch_document(&self, path: &str) -> impl Future<Output = Result<Document>> + Send;

    /// Current revision of a file, `None` if it does not exist
    fn revision(&self, path: &str) -> impl Future<Output = Result<Option<Revision>>> + Send;

    /// Write `content` to `path`.
    ///
    /// When `expected` is given and differs from the current revision the
    /// write is refused with [`Error::Conflict`].
    fn commit_document(
        &self,
        path: &str,
        content: &str,
        message: &str,
        expected: Option<&Revision>,
    ) -> impl Future<Output = Result<Revision>> + Send;
}

/// [`DocumentRemote`] over a directory on disk, revisions are SHA-256 hashes
#[derive(Debug, Clone)]
pub struct LocalRemote {
    root: PathBuf,
}

impl LocalRemote {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a repository-relative path, refusing anything that escapes the root
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(Error::Transport(format!("invalid remote path: {path}")));
        }
        Ok(self.root.join(relative))
    }

    async fn read(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Transport(format!("failed to read {path}: {e}"))),
        }
    }
}

fn content_revision(bytes: &[u8]) -> Revision {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Revision(hex::encode(hasher.finalize()))
}

impl DocumentRemote for LocalRemote {
    async fn fetch_document(&self, path: &str) -> Result<Document> {
        let bytes = self
            .read(path)
            .await?
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| Error::structural("$", format!("{path} is not UTF-8: {e}")))?;
        Document::from_json_str(&text)
    }

    async fn revision(&self, path: &str) -> Result<Option<Revision>> {
        Ok(self.read(path).await?.map(|bytes| content_revision(&bytes)))
    }

    async fn commit_document(
        &self,
        path: &str,
        content: &str,
        message: &str,
        expected: Option<&Revision>,
    ) -> Result<Revision> {
        if let Some(expected) = expected {
            let actual = self.revision(path).await?;
            if actual.as_ref() != Some(expected) {
                return Err(Error::Conflict {
                    path: path.to_string(),
                    expected: expected.to_string(),
                    actual: actual.map(|r| r.0).unwrap_or_else(|| "<missing>".to_string()),
                });
            }
        }

        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Transport(format!("failed to create {path}: {e}")))?;
        }
        tokio::fs::write(&full, content.as_bytes())
            .await
            .map_err(|e| Error::Transport(format!("failed to write {path}: {e}")))?;

        let revision = content_revision(content.as_bytes());
        tracing::info!(path, %revision, commit_message = message, "Committed document");
        Ok(revision)
    }
}
