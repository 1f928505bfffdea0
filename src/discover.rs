//! Repository discovery for batch mode.
//!
//! Walks the configured scan directories looking for git working copies
//! (directories containing `.git`) and filters them through the configured
//! ignore globs. Discovery never descends into a repository once found.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::config::Config;

/// Directory names never worth descending into.
const SKIP_DIRS: &[&str] = &["node_modules", "target", ".git"];

/// Scan all configured directories for git repositories, applying the ignore
/// patterns against each repository's path relative to its scan root.
pub fn scan_repos(config: &Config) -> Result<Vec<PathBuf>> {
    let ignore_set = build_globset(&config.repos.ignore)?;
    let mut repos = Vec::new();

    for dir in &config.repos.scan_dirs {
        if !dir.is_dir() {
            bail!("Scan directory does not exist: {}", dir.display());
        }

        let mut walker = WalkDir::new(dir).into_iter();
        while let Some(entry) = walker.next() {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if SKIP_DIRS.contains(&name.as_ref()) {
                walker.skip_current_dir();
                continue;
            }

            if entry.path().join(".git").exists() {
                let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
                if !ignore_set.is_match(relative.to_string_lossy().as_ref()) {
                    repos.push(entry.path().to_path_buf());
                }
                // A repository's subdirectories are not candidate repos.
                walker.skip_current_dir();
            }
        }
    }

    repos.sort();
    repos.dedup();
    Ok(repos)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
