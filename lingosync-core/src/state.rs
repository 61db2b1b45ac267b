//! Application state container
//!
//! All mutable editor state (projects, the active project, settings and the
//! in-flight flags) lives here and changes only through the operations below:
//! replace a table, set one row field, or mark rows in flight. The whole
//! `{projects, activeProjectId, settings}` snapshot persists as one blob
//! under a single storage key.

use crate::config::SuggestionConfig;
use crate::db::SnapshotStore;
use crate::error::{Error, Result};
use crate::model::AiModel;
use crate::project::{Project, RepoConfig};
use crate::rows::{RowField, RowTable, TranslationRow};
use crate::suggest::{InFlightSet, SuggestionSink};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Storage key of the persisted snapshot
pub const STORAGE_KEY: &str = "lingosync.state";

/// User settings persisted with the snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub model: AiModel,
    pub api_key: String,
    /// Rows per suggestion request
    pub chunk_size: usize,
    pub source_lang: String,
    pub target_lang: String,
    pub extra_instructions: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::from(&SuggestionConfig::default())
    }
}

impl From<&SuggestionConfig> for Settings {
    fn from(config: &SuggestionConfig) -> Self {
        Self {
            model: config.model,
            api_key: config.resolved_api_key().unwrap_or_default(),
            chunk_size: config.chunk_size,
            source_lang: config.source_lang.clone(),
            target_lang: config.target_lang.clone(),
            extra_instructions: config.extra_instructions.clone(),
        }
    }
}

/// Persisted editor state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub active_project_id: Option<String>,
    #[serde(default)]
    pub settings: Settings,
}

impl AppState {
    /// Load the snapshot, or an empty state when nothing was saved yet
    pub fn load_from(store: &dyn SnapshotStore) -> Result<Self> {
        Ok(Self::load_existing(store)?.unwrap_or_default())
    }

    /// Saved state, or `None` if nothing was ever saved
    pub fn load_existing(store: &dyn SnapshotStore) -> Result<Option<Self>> {
        match store.load(STORAGE_KEY)? {
            Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
            None => Ok(None),
        }
    }

    pub fn save_to(&self, store: &dyn SnapshotStore) -> Result<()> {
        let blob = serde_json::to_string(self)?;
        store.save(STORAGE_KEY, &blob)
    }

    /// Create an empty project and make it active. Returns its id.
    pub fn create_project(&mut self, name: impl Into<String>, config: RepoConfig) -> String {
        self.add_project(Project::new(name, config))
    }

    /// Add an existing (e.g. imported) project and make it active
    pub fn add_project(&mut self, project: Project) -> String {
        let id = project.id.clone();
        tracing::info!(id = %id, name = %project.name, "Adding project");
        self.projects.push(project);
        self.active_project_id = Some(id.clone());
        id
    }

    pub fn remove_project(&mut self, id: &str) -> Result<Project> {
        let pos = self
            .projects
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::ProjectNotFound(id.to_string()))?;
        let project = self.projects.remove(pos);
        if self.active_project_id.as_deref() == Some(id) {
            self.active_project_id = self.projects.first().map(|p| p.id.clone());
        }
        Ok(project)
    }

    pub fn set_active(&mut self, id: &str) -> Result<()> {
        self.project(id)?;
        self.active_project_id = Some(id.to_string());
        Ok(())
    }

    pub fn active_project(&self) -> Option<&Project> {
        let id = self.active_project_id.as_deref()?;
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn project(&self, id: &str) -> Result<&Project> {
        self.projects
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::ProjectNotFound(id.to_string()))
    }

    pub fn project_mut(&mut self, id: &str) -> Result<&mut Project> {
        self.projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::ProjectNotFound(id.to_string()))
    }

    /// Replace a project's whole row table
    pub fn replace_table(&mut self, id: &str, table: RowTable) -> Result<()> {
        let project = self.project_mut(id)?;
        project.rows = table;
        project.touch();
        Ok(())
    }

    /// Update one editable field of one row
    pub fn set_row_field(
        &mut self,
        id: &str,
        key: &str,
        field: RowField,
        value: impl Into<String>,
    ) -> Result<()> {
        let project = self.project_mut(id)?;
        project.rows.set_field(key, field, value)?;
        project.touch();
        Ok(())
    }
}

/// Cloneable handle to the shared state and its in-flight flags.
///
/// Locks are short and synchronous; no lock is held across an await.
#[derive(Debug, Clone, Default)]
pub struct StateHandle {
    state: Arc<Mutex<AppState>>,
    in_flight: InFlightSet,
}

impl StateHandle {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            in_flight: InFlightSet::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn in_flight(&self) -> &InFlightSet {
        &self.in_flight
    }

    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.lock())
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut AppState) -> R) -> R {
        f(&mut self.lock())
    }

    /// Clone of the whole state, e.g. for persisting
    pub fn snapshot(&self) -> AppState {
        self.lock().clone()
    }

    pub fn settings(&self) -> Settings {
        self.lock().settings.clone()
    }

    /// Rows of a project, cloned so callers can await without holding a lock
    pub fn rows(&self, project_id: &str) -> Result<Vec<TranslationRow>> {
        Ok(self.lock().project(project_id)?.rows.rows().to_vec())
    }

    pub fn replace_table(&self, project_id: &str, table: RowTable) -> Result<()> {
        self.lock().replace_table(project_id, table)
    }

    pub fn set_row_field(
        &self,
        project_id: &str,
        key: &str,
        field: RowField,
        value: impl Into<String>,
    ) -> Result<()> {
        self.lock().set_row_field(project_id, key, field, value)
    }

    /// Suggestion sink writing into one project's rows
    pub fn project_sink(&self, project_id: impl Into<String>) -> ProjectSink<'_> {
        ProjectSink {
            handle: self,
            project_id: project_id.into(),
        }
    }
}

/// Writes batch suggestions into a project held by a [`StateHandle`]
pub struct ProjectSink<'a> {
    handle: &'a StateHandle,
    project_id: String,
}

impl SuggestionSink for ProjectSink<'_> {
    fn apply_suggestion(&self, key: &str, suggestion: &str) -> bool {
        self.handle
            .set_row_field(&self.project_id, key, RowField::Suggestion, suggestion)
            .is_ok()
    }
}
