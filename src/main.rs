//! # gitledger CLI
//!
//! The `gitledger` binary extracts commit, tag, and author history from local
//! git repositories and loads it into SQLite for analytical querying.
//!
//! ## Usage
//!
//! ```bash
//! gitledger --config ./gitledger.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `gitledger init` | Create the SQLite database and run schema migrations |
//! | `gitledger sync <path>` | ETL a single repository |
//! | `gitledger sync` | ETL every configured repository (paths + scan dirs) |
//! | `gitledger sources` | List configured repositories and their health |
//! | `gitledger stats` | Database totals and per-repository breakdown |

mod aggregate;
mod config;
mod db;
mod discover;
mod gitcmd;
mod ingest;
mod migrate;
mod models;
mod parser;
mod progress;
mod sources;
mod stats;
mod store;
mod validate;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::ingest::CommitFilter;
use crate::models::CommitRecord;
use crate::progress::ProgressMode;

/// gitledger — git history ETL into SQLite.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; `sync` with an explicit path also works without one.
#[derive(Parser)]
#[command(
    name = "gitledger",
    about = "gitledger — extract git commit, tag, and author history into SQLite",
    version,
    long_about = "gitledger parses git commit logs and tag refs, aggregates per-author and \
    per-day activity, and loads everything into a SQLite database with idempotent, \
    transactional upserts. Re-running a sync on an unchanged repository produces no duplication."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./gitledger.toml`. Database location, repository paths,
    /// scan directories, and sync tuning are read from this file.
    #[arg(long, global = true, default_value = "./gitledger.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables (repos,
    /// commits, authors, file_changes, tags, daily_stats). This command is
    /// idempotent — running it multiple times is safe.
    Init,

    /// Extract and load repository history.
    ///
    /// With a PATH argument, runs the ETL for that single repository. Without
    /// one, processes every repository configured under `repos.paths` plus
    /// those discovered under `repos.scan_dirs`, sequentially; one
    /// repository's failure does not stop its siblings.
    Sync {
        /// Path to a single repository working copy.
        path: Option<PathBuf>,

        /// Fail a repository on any malformed block or validation violation
        /// instead of dropping and counting.
        #[arg(long)]
        strict: bool,

        /// Progress output on stderr: off, human, or json.
        /// Defaults to human when stderr is a TTY.
        #[arg(long)]
        progress: Option<String>,
    },

    /// List configured repositories and scan directories with health status.
    Sources,

    /// Show database totals and a per-repository breakdown.
    Stats,
}

fn parse_progress_mode(value: Option<&str>) -> Result<ProgressMode> {
    match value {
        None => Ok(ProgressMode::default_for_tty()),
        Some("off") => Ok(ProgressMode::Off),
        Some("human") => Ok(ProgressMode::Human),
        Some("json") => Ok(ProgressMode::Json),
        Some(other) => anyhow::bail!(
            "Unknown progress mode: '{}'. Must be off, human, or json.",
            other
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let cfg = config::load_config_or_minimal(&cli.config)?;
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sync {
            path,
            strict,
            progress,
        } => {
            // Single-repository mode works without a config file; batch mode
            // requires one. A config file that exists but is broken fails
            // either way.
            let mut cfg = match &path {
                Some(_) => config::load_config_or_minimal(&cli.config)?,
                None => config::load_config(&cli.config)?,
            };
            if strict {
                cfg.sync.strict = true;
            }

            let reporter = parse_progress_mode(progress.as_deref())?.reporter();

            // Author filtering is a pluggable predicate handed to the batch
            // driver, built here from the optional config substring.
            let author_filter = cfg.sync.author_filter.clone();
            let predicate = author_filter.map(|needle| {
                move |commit: &CommitRecord| {
                    !commit.author_name.contains(&needle) && !commit.author_email.contains(&needle)
                }
            });
            let filter: Option<Box<CommitFilter>> = match predicate {
                Some(p) => Some(Box::new(p)),
                None => None,
            };

            ingest::run_sync(&cfg, path.as_deref(), filter.as_deref(), reporter).await?;
        }
        Commands::Sources => {
            let cfg = config::load_config(&cli.config)?;
            sources::list_sources(&cfg)?;
        }
        Commands::Stats => {
            let cfg = config::load_config(&cli.config)?;
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
