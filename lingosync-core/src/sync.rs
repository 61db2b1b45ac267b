//! Fetch and commit workflows
//!
//! `sync` pulls both locale files from a [`DocumentRemote`] and reconciles
//! them into the project's table. `commit` writes the edited targets back.
//! Shared-state variants never hold the state lock across a remote call.

use crate::codec::{flatten, unflatten, FlatDocument};
use crate::document::Document;
use crate::error::{Error, Result};
use crate::project::{Project, RepoConfig};
use crate::reconcile::{reconcile_with_stats, ReconcileStats};
use crate::remote::{DocumentRemote, Revision};
use crate::state::StateHandle;

/// Raw documents of one fetch
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDocuments {
    pub source: Document,
    pub target: Document,
}

/// Result of a successful commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub revision: Revision,
    /// Rows whose edits became the new baseline
    pub committed_rows: usize,
}

/// Fetch source and target. A missing target is an empty locale file.
pub async fn fetch_documents<R>(remote: &R, config: &RepoConfig) -> Result<FetchedDocuments>
where
    R: DocumentRemote + ?Sized,
{
    let source = remote.fetch_document(&config.source_path).await?;
    let target = match remote.fetch_document(&config.target_path).await {
        Ok(doc) => doc,
        Err(Error::NotFound(path)) => {
            tracing::info!(path = %path, "Target file missing, starting from an empty document");
            Document::default()
        }
        Err(e) => return Err(e),
    };
    Ok(FetchedDocuments { source, target })
}

/// Reconcile fetched documents into a project
pub fn apply_fetch(project: &mut Project, fetched: FetchedDocuments) -> ReconcileStats {
    let (table, stats) = reconcile_with_stats(
        &project.rows,
        &flatten(&fetched.source),
        &flatten(&fetched.target),
    );
    project.rows = table;
    project.original_target_data = Some(fetched.target);
    project.touch();

    tracing::info!(
        project = %project.id,
        rows = stats.rows,
        added = stats.added,
        preserved_edits = stats.preserved_edits,
        dropped = stats.dropped,
        "Synced project"
    );
    stats
}

/// Fetch and reconcile a project held directly by the caller
pub async fn sync_project<R>(remote: &R, project: &mut Project) -> Result<ReconcileStats>
where
    R: DocumentRemote + ?Sized,
{
    let fetched = fetch_documents(remote, &project.config).await?;
    Ok(apply_fetch(project, fetched))
}

/// Fetch and reconcile a project inside shared state
pub async fn sync_shared<R>(
    remote: &R,
    handle: &StateHandle,
    project_id: &str,
) -> Result<ReconcileStats>
where
    R: DocumentRemote + ?Sized,
{
    let config = handle.read(|state| state.project(project_id).map(|p| p.config.clone()))?;
    let fetched = fetch_documents(remote, &config).await?;
    handle.update(|state| Ok::<_, Error>(apply_fetch(state.project_mut(project_id)?, fetched)))
}

/// Targets captured for one commit
struct RenderedTarget {
    entries: FlatDocument,
    document: Document,
    content: String,
}

/// Serialize the current targets over the last fetched target document
fn render_target(project: &Project) -> Result<RenderedTarget> {
    let entries = project.rows.target_entries();
    let document = unflatten(&entries, project.original_target_data.as_ref())?;
    let content = document.to_canonical_string()?;
    Ok(RenderedTarget {
        entries,
        document,
        content,
    })
}

/// Only the pushed values become baselines; later edits stay modified.
fn finish_commit(project: &mut Project, rendered: RenderedTarget) -> usize {
    let committed_rows = project.rows.mark_committed(&rendered.entries);
    project.original_target_data = Some(rendered.document);
    project.touch();
    committed_rows
}

/// Write the project's targets back to the remote target file
pub async fn commit_project<R>(
    remote: &R,
    project: &mut Project,
    message: &str,
) -> Result<CommitReport>
where
    R: DocumentRemote + ?Sized,
{
    let rendered = render_target(project)?;
    let path = project.config.target_path.clone();

    let expected = remote.revision(&path).await?;
    let revision = remote
        .commit_document(&path, &rendered.content, message, expected.as_ref())
        .await?;

    let committed_rows = finish_commit(project, rendered);
    tracing::info!(project = %project.id, %revision, committed_rows, "Committed project");
    Ok(CommitReport {
        revision,
        committed_rows,
    })
}

/// Commit a project inside shared state
pub async fn commit_shared<R>(
    remote: &R,
    handle: &StateHandle,
    project_id: &str,
    message: &str,
) -> Result<CommitReport>
where
    R: DocumentRemote + ?Sized,
{
    let (path, rendered) = handle.read(|state| {
        let project = state.project(project_id)?;
        Ok::<_, Error>((project.config.target_path.clone(), render_target(project)?))
    })?;

    let expected = remote.revision(&path).await?;
    let revision = remote
        .commit_document(&path, &rendered.content, message, expected.as_ref())
        .await?;

    let committed_rows =
        handle.update(|state| Ok::<_, Error>(finish_commit(state.project_mut(project_id)?, rendered)))?;
    tracing::info!(project = %project_id, %revision, committed_rows, "Committed project");
    Ok(CommitReport {
        revision,
        committed_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::LocalRemote;
    use crate::rows::RowField;
    use crate::state::AppState;

    fn config() -> RepoConfig {
        RepoConfig {
            source_path: "en.json".to_string(),
            target_path: "fr.json".to_string(),
            ..RepoConfig::default()
        }
    }

    fn write(dir: &tempfile::TempDir, name: &str, text: &str) {
        std::fs::write(dir.path().join(name), text).unwrap();
    }

    #[tokio::test]
    async fn test_sync_then_commit_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "en.json", r#"{"a": {"b": "Hello", "c": "Bye"}, "n": 3}"#);
        write(&dir, "fr.json", r#"{"a": {"b": "Bonjour"}, "keep": [1, 2]}"#);
        let remote = LocalRemote::new(dir.path());

        let mut project = Project::new("Docs", config());
        let stats = sync_project(&remote, &mut project).await.unwrap();
        assert_eq!(stats.rows, 2);
        assert_eq!(project.rows.get("a.c").unwrap().target_value, "Bye");

        project.rows.set_target("a.b", "Salut").unwrap();
        let report = commit_project(&remote, &mut project, "Update fr")
            .await
            .unwrap();
        assert_eq!(report.committed_rows, 1);
        assert_eq!(project.rows.modified_count(), 0);

        let written = remote.fetch_document("fr.json").await.unwrap();
        assert_eq!(
            written,
            Document::from_json_str(r#"{"a": {"b": "Salut", "c": "Bye"}, "keep": [1, 2]}"#)
                .unwrap()
        );
        assert_eq!(remote.revision("fr.json").await.unwrap(), Some(report.revision));
    }

    #[tokio::test]
    async fn test_missing_target_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "en.json", r#"{"title": "Hello"}"#);
        let remote = LocalRemote::new(dir.path());

        let mut project = Project::new("New locale", config());
        sync_project(&remote, &mut project).await.unwrap();

        let row = project.rows.get("title").unwrap();
        assert_eq!(row.original_target_value, "Hello");
        assert_eq!(project.original_target_data, Some(Document::default()));
    }

    #[tokio::test]
    async fn test_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let remote = LocalRemote::new(dir.path());
        let mut project = Project::new("Broken", config());
        assert!(matches!(
            sync_project(&remote, &mut project).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resync_preserves_edits_in_shared_state() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "en.json", r#"{"a": {"b": "Hello"}}"#);
        write(&dir, "fr.json", r#"{"a": {"b": "Bonjour"}}"#);
        let remote = LocalRemote::new(dir.path());

        let mut state = AppState::default();
        let id = state.create_project("Docs", config());
        let handle = StateHandle::new(state);

        sync_shared(&remote, &handle, &id).await.unwrap();
        handle
            .set_row_field(&id, "a.b", RowField::Target, "Salut")
            .unwrap();

        write(&dir, "fr.json", r#"{"a": {"b": "Bonjour!"}}"#);
        let stats = sync_shared(&remote, &handle, &id).await.unwrap();
        assert_eq!(stats.preserved_edits, 1);

        let row = handle.rows(&id).unwrap().remove(0);
        assert_eq!(row.target_value, "Salut");
        assert_eq!(row.original_target_value, "Bonjour!");

        let report = commit_shared(&remote, &handle, &id, "Edit").await.unwrap();
        assert_eq!(report.committed_rows, 1);
        assert_eq!(
            remote.fetch_document("fr.json").await.unwrap(),
            Document::from_json_str(r#"{"a": {"b": "Salut"}}"#).unwrap()
        );
    }

    /// Local remote that edits a row in shared state while a write is pending
    struct EditDuringCommit {
        inner: LocalRemote,
        handle: StateHandle,
        project_id: String,
    }

    impl DocumentRemote for EditDuringCommit {
        async fn fetch_document(&self, path: &str) -> Result<Document> {
            self.inner.fetch_document(path).await
        }

        async fn revision(&self, path: &str) -> Result<Option<Revision>> {
            self.inner.revision(path).await
        }

        async fn commit_document(
            &self,
            path: &str,
            content: &str,
            message: &str,
            expected: Option<&Revision>,
        ) -> Result<Revision> {
            self.handle
                .set_row_field(&self.project_id, "a.c", RowField::Target, "Au revoir")
                .unwrap();
            self.inner
                .commit_document(path, content, message, expected)
                .await
        }
    }

    #[tokio::test]
    async fn test_edit_during_commit_stays_modified() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "en.json", r#"{"a": {"b": "Hello", "c": "Bye"}}"#);
        write(&dir, "fr.json", r#"{"a": {"b": "Bonjour", "c": "Bye"}}"#);

        let mut state = AppState::default();
        let id = state.create_project("Docs", config());
        let handle = StateHandle::new(state);
        let remote = EditDuringCommit {
            inner: LocalRemote::new(dir.path()),
            handle: handle.clone(),
            project_id: id.clone(),
        };

        sync_shared(&remote, &handle, &id).await.unwrap();
        handle
            .set_row_field(&id, "a.b", RowField::Target, "Salut")
            .unwrap();

        let report = commit_shared(&remote, &handle, &id, "Edit").await.unwrap();
        assert_eq!(report.committed_rows, 1);
        assert_eq!(
            remote.fetch_document("fr.json").await.unwrap(),
            Document::from_json_str(r#"{"a": {"b": "Salut", "c": "Bye"}}"#).unwrap()
        );

        let rows = handle.rows(&id).unwrap();
        let b = rows.iter().find(|r| r.key == "a.b").unwrap();
        assert!(!b.is_modified());
        let c = rows.iter().find(|r| r.key == "a.c").unwrap();
        assert_eq!(c.target_value, "Au revoir");
        assert_eq!(c.original_target_value, "Bye");
        assert!(c.is_modified());
    }

    #[tokio::test]
    async fn test_unknown_project_in_shared_state() {
        let dir = tempfile::tempdir().unwrap();
        let remote = LocalRemote::new(dir.path());
        let handle = StateHandle::default();
        assert!(matches!(
            sync_shared(&remote, &handle, "missing").await,
            Err(Error::ProjectNotFound(_))
        ));
    }
}
