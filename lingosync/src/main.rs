//! lingosync - localization file editor
//!
//! Flattens and rebuilds locale documents, reconciles source and target
//! files into translation rows, filters rows with the query language, and
//! keeps projects in a local snapshot database.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::OutputFormat;
use lingosync_core::Config;

#[derive(Parser)]
#[command(name = "lingosync")]
#[command(about = "Reconcile, query and commit localization files")]
#[command(version)]
struct Args {
    /// Use this config file instead of the XDG default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the flat leaf table of a JSON document
    Flatten {
        /// JSON document
        file: PathBuf,
    },

    /// Rebuild a document from a flat leaf table
    Unflatten {
        /// Flat JSON object of path -> scalar
        file: PathBuf,

        /// Document whose structure the result is built on
        #[arg(short, long)]
        base: Option<PathBuf>,
    },

    /// Reconcile a source/target pair into translation rows
    Reconcile {
        #[arg(short, long)]
        source: PathBuf,

        /// Target document; a missing file counts as empty
        #[arg(short, long)]
        target: PathBuf,

        /// Previously edited rows to carry edits and suggestions from
        #[arg(short, long)]
        rows: Option<PathBuf>,
    },

    /// Filter translation rows with a query such as "menu #modified || #ai"
    Query {
        query: String,

        /// Rows file (as written by `reconcile`)
        #[arg(short, long, conflicts_with = "project")]
        rows: Option<PathBuf>,

        /// Stored project id (prefix match supported)
        #[arg(short, long)]
        project: Option<String>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Create a stored project
    New {
        #[arg(short, long)]
        name: String,

        /// Path of the source locale file, relative to the repository root
        #[arg(long)]
        source_path: String,

        /// Path of the target locale file, relative to the repository root
        #[arg(long)]
        target_path: String,

        #[arg(long, default_value = "English")]
        source_lang: String,

        #[arg(long, default_value = "French")]
        target_lang: String,
    },

    /// List stored projects
    List,

    /// Fetch both locale files from a local repository and reconcile them
    Sync {
        project: String,

        /// Repository root
        #[arg(long)]
        root: PathBuf,
    },

    /// Change one row of a stored project
    Set {
        project: String,
        key: String,
        value: String,

        /// Write the AI suggestion instead of the target
        #[arg(long)]
        suggestion: bool,
    },

    /// Write edited targets back to the local repository
    Commit {
        project: String,

        #[arg(long)]
        root: PathBuf,

        #[arg(short, long, default_value = "Update translations")]
        message: String,
    },

    /// Export a stored project as JSON or as a share token
    Export {
        project: String,

        /// Print a URL-safe share token instead of JSON
        #[arg(long)]
        token: bool,
    },

    /// Import a project from an export file or share token ("-" reads stdin)
    Import { input: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path).context("failed to load configuration")?,
        None => Config::load().context("failed to load configuration")?,
    };

    let _log_guard =
        lingosync_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::debug!("lingosync starting up");

    match args.command {
        Command::Flatten { file } => commands::flatten(&file),
        Command::Unflatten { file, base } => commands::unflatten(&file, base.as_deref()),
        Command::Reconcile {
            source,
            target,
            rows,
        } => commands::reconcile(&source, &target, rows.as_deref()),
        Command::Query {
            query,
            rows,
            project,
            format,
        } => commands::query(&config, &query, rows.as_deref(), project.as_deref(), format),
        Command::New {
            name,
            source_path,
            target_path,
            source_lang,
            target_lang,
        } => commands::new_project(
            &config,
            name,
            lingosync_core::RepoConfig {
                source_path,
                target_path,
                source_lang,
                target_lang,
                ..Default::default()
            },
        ),
        Command::List => commands::list(&config),
        Command::Sync { project, root } => commands::sync(&config, &project, root).await,
        Command::Set {
            project,
            key,
            value,
            suggestion,
        } => commands::set(&config, &project, &key, value, suggestion),
        Command::Commit {
            project,
            root,
            message,
        } => commands::commit(&config, &project, root, &message).await,
        Command::Export { project, token } => commands::export(&config, &project, token),
        Command::Import { input } => commands::import(&config, &input),
    }
}
