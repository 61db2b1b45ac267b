//! Subcommand implementations

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use lingosync_core::suggest::InFlightSet;
use lingosync_core::sync::{commit_project, sync_project};
use lingosync_core::{
    codec, import_project, AppState, Config, Document, FlatDocument, LocalRemote, Query,
    RepoConfig, RowField, RowTable, Settings, SqliteStore, TranslationRow,
};

/// How `query` prints matching rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One `key<TAB>target` line per row
    Text,
    /// Pretty JSON array of rows
    Json,
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_document(path: &Path) -> Result<Document> {
    Document::from_json_str(&read_file(path)?)
        .with_context(|| format!("failed to parse {}", path.display()))
}

fn read_rows(path: &Path) -> Result<RowTable> {
    serde_json::from_str(&read_file(path)?)
        .with_context(|| format!("failed to parse rows in {}", path.display()))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Snapshot database plus the state loaded from it
struct Store {
    store: SqliteStore,
    state: AppState,
}

impl Store {
    fn open(config: &Config) -> Result<Self> {
        let path = config.resolved_database_path();
        tracing::info!(path = %path.display(), "Opening snapshot store");

        let store = SqliteStore::open(&path).context("failed to open database")?;
        store.migrate().context("failed to run database migrations")?;

        let state = match AppState::load_existing(&store).context("failed to load saved state")? {
            Some(state) => state,
            None => AppState {
                settings: Settings::from(&config.suggestions),
                ..AppState::default()
            },
        };

        Ok(Self { store, state })
    }

    fn save(&self) -> Result<()> {
        self.state
            .save_to(&self.store)
            .context("failed to save state")
    }

    /// Exact id, or the single project whose id starts with `prefix`
    fn resolve(&self, prefix: &str) -> Result<String> {
        resolve_project_id(&self.state, prefix)
    }
}

fn resolve_project_id(state: &AppState, prefix: &str) -> Result<String> {
    if let Ok(project) = state.project(prefix) {
        return Ok(project.id.clone());
    }

    let matches: Vec<&str> = state
        .projects
        .iter()
        .filter(|p| p.id.starts_with(prefix))
        .map(|p| p.id.as_str())
        .collect();

    match matches.as_slice() {
        [id] => Ok(id.to_string()),
        [] => bail!("No project found matching '{}'", prefix),
        _ => bail!("'{}' matches {} projects, use a longer id", prefix, matches.len()),
    }
}

pub fn flatten(file: &Path) -> Result<()> {
    let document = read_document(file)?;
    print_json(&codec::flatten(&document))
}

pub fn unflatten(file: &Path, base: Option<&Path>) -> Result<()> {
    let flat: FlatDocument = serde_json::from_str(&read_file(file)?)
        .with_context(|| format!("{} is not a flat table", file.display()))?;
    let base = base.map(read_document).transpose()?;

    let document = codec::unflatten(&flat, base.as_ref())?;
    print!("{}", document.to_canonical_string()?);
    Ok(())
}

pub fn reconcile(source: &Path, target: &Path, rows: Option<&Path>) -> Result<()> {
    let source = read_document(source)?;
    let target = if target.exists() {
        read_document(target)?
    } else {
        Document::default()
    };
    let existing = rows.map(read_rows).transpose()?.unwrap_or_default();

    let (table, stats) = lingosync_core::reconcile_with_stats(
        &existing,
        &codec::flatten(&source),
        &codec::flatten(&target),
    );

    print_json(&table)?;
    eprintln!(
        "{} rows ({} new, {} edits kept, {} dropped)",
        stats.rows, stats.added, stats.preserved_edits, stats.dropped
    );
    Ok(())
}

pub fn query(
    config: &Config,
    query: &str,
    rows: Option<&Path>,
    project: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let table = match (rows, project) {
        (Some(path), _) => read_rows(path)?,
        (None, Some(prefix)) => {
            let store = Store::open(config)?;
            let id = store.resolve(prefix)?;
            store.state.project(&id)?.rows.clone()
        }
        (None, None) => {
            let store = Store::open(config)?;
            match store.state.active_project() {
                Some(project) => project.rows.clone(),
                None => bail!("No rows given and no active project"),
            }
        }
    };

    let query = Query::parse(query);
    for error in query.pattern_errors() {
        eprintln!("warning: {}", error);
    }

    let hits: Vec<&TranslationRow> = query.filter(table.rows(), &InFlightSet::new());
    match format {
        OutputFormat::Json => print_json(&hits)?,
        OutputFormat::Text => {
            for row in &hits {
                println!("{}\t{}", row.key, row.target_value);
            }
            eprintln!("{} of {} rows", hits.len(), table.len());
        }
    }
    Ok(())
}

pub fn new_project(config: &Config, name: String, repo: RepoConfig) -> Result<()> {
    let mut store = Store::open(config)?;
    let id = store.state.create_project(name, repo);
    store.save()?;
    println!("{}", id);
    Ok(())
}

pub fn list(config: &Config) -> Result<()> {
    let store = Store::open(config)?;
    if store.state.projects.is_empty() {
        println!("No projects. Create one with 'lingosync new'.");
        return Ok(());
    }

    let active = store.state.active_project_id.as_deref();
    for project in &store.state.projects {
        let marker = if Some(project.id.as_str()) == active {
            "*"
        } else {
            " "
        };
        println!(
            "{} {}  {}  {} rows, {} modified  (updated {})",
            marker,
            project.id,
            project.name,
            project.rows.len(),
            project.rows.modified_count(),
            project.last_modified.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

pub async fn sync(config: &Config, prefix: &str, root: PathBuf) -> Result<()> {
    let mut store = Store::open(config)?;
    let id = store.resolve(prefix)?;
    let remote = LocalRemote::new(root);

    let project = store.state.project_mut(&id)?;
    let stats = sync_project(&remote, project)
        .await
        .with_context(|| format!("failed to sync project {}", id))?;
    store.state.set_active(&id)?;
    store.save()?;

    println!("Sync complete:");
    println!("  Rows:             {}", stats.rows);
    println!("  New keys:         {}", stats.added);
    println!("  Edits preserved:  {}", stats.preserved_edits);
    println!("  Keys dropped:     {}", stats.dropped);
    Ok(())
}

pub fn set(config: &Config, prefix: &str, key: &str, value: String, suggestion: bool) -> Result<()> {
    let mut store = Store::open(config)?;
    let id = store.resolve(prefix)?;
    let field = if suggestion {
        RowField::Suggestion
    } else {
        RowField::Target
    };
    store.state.set_row_field(&id, key, field, value)?;
    store.save()
}

pub async fn commit(config: &Config, prefix: &str, root: PathBuf, message: &str) -> Result<()> {
    let mut store = Store::open(config)?;
    let id = store.resolve(prefix)?;
    let remote = LocalRemote::new(root);

    let project = store.state.project_mut(&id)?;
    let report = commit_project(&remote, project, message)
        .await
        .with_context(|| format!("failed to commit project {}", id))?;
    store.save()?;

    println!(
        "Committed {} row(s), revision {}",
        report.committed_rows, report.revision
    );
    Ok(())
}

pub fn export(config: &Config, prefix: &str, token: bool) -> Result<()> {
    let store = Store::open(config)?;
    let project = store.state.project(&store.resolve(prefix)?)?;
    if token {
        println!("{}", project.share_token()?);
    } else {
        println!("{}", project.export_json()?);
    }
    Ok(())
}

pub fn import(config: &Config, input: &str) -> Result<()> {
    let text = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else if Path::new(input).is_file() {
        read_file(Path::new(input))?
    } else {
        input.to_string()
    };

    let project = import_project(&text).context("failed to import project")?;
    let mut store = Store::open(config)?;
    let id = store.state.add_project(project);
    store.save()?;
    println!("{}", id);
    Ok(())
}
