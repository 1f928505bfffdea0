//! ETL pipeline orchestration.
//!
//! Coordinates the full sync flow for a repository: git extraction → parse →
//! validate → aggregate → one atomic load. Repositories are processed
//! strictly sequentially; in batch mode a fatal error for one repository is
//! caught and reported so its siblings still run.

use anyhow::{bail, Context, Result};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::aggregate;
use crate::config::Config;
use crate::db;
use crate::discover;
use crate::gitcmd;
use crate::models::{CommitRecord, ExtractSummary, RepoMetadata};
use crate::parser;
use crate::progress::{SyncProgressEvent, SyncProgressReporter};
use crate::store::{self, WriteCounters};
use crate::validate;

/// Pluggable commit predicate for the batch driver: return `true` to keep a
/// commit. Built by the CLI from `sync.author_filter`; the core carries no
/// hard-coded filtering rule.
pub type CommitFilter = dyn Fn(&CommitRecord) -> bool + Send + Sync;

/// Per-repository outcome returned to the caller for reporting. Record-level
/// problems (skipped blocks, validation violations, duplicate keys) live here
/// as counters; only repo-fatal errors propagate as failures.
#[derive(Debug)]
pub struct RepoReport {
    pub repo: String,
    pub branch: String,
    pub parsed_commits: usize,
    pub skipped_blocks: usize,
    pub invalid_commits: usize,
    pub invalid_tags: usize,
    pub filtered_commits: usize,
    pub commits: WriteCounters,
    pub file_changes: WriteCounters,
    pub authors: WriteCounters,
    pub daily_stats: WriteCounters,
    pub tags: WriteCounters,
    pub summary: ExtractSummary,
}

/// Run the full ETL for one repository: extract its log and tags, validate
/// and aggregate, then load everything in a single transaction.
///
/// Branch resolution and log reading are fatal; tag listing and language
/// detection degrade to an empty list / `None`.
pub async fn sync_repository(
    pool: &SqlitePool,
    config: &Config,
    repo_path: &Path,
    filter: Option<&CommitFilter>,
    progress: Arc<dyn SyncProgressReporter>,
) -> Result<RepoReport> {
    let repo_path = repo_path
        .canonicalize()
        .with_context(|| format!("Repository path not found: {}", repo_path.display()))?;
    let repo_name = repo_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| anyhow::anyhow!("Cannot derive a repository name from {}", repo_path.display()))?;

    progress.report(SyncProgressEvent::Extracting {
        repo: repo_name.clone(),
    });

    let branch = gitcmd::resolve_current_branch(&repo_path)?;
    let raw_log = gitcmd::read_log(&repo_path, &branch)?;

    let (parsed, skipped) = parser::parse_commit_log(&raw_log, &repo_name, &branch);
    if config.sync.strict && !skipped.is_empty() {
        bail!(
            "{}: {} malformed commit blocks in strict mode",
            repo_name,
            skipped.len()
        );
    }

    let parsed_total = parsed.len();
    let (kept, filtered_commits) = apply_filter(parsed, filter);
    let (commits, invalid_commits) = drop_invalid_commits(kept, &repo_name, config.sync.strict)?;

    // Tags and language detection degrade gracefully.
    let all_tags = match gitcmd::list_tag_refs(&repo_path) {
        Ok(raw) => parser::parse_tag_refs(&raw, &repo_name),
        Err(_) => Vec::new(),
    };
    let tag_total = all_tags.len();
    let tags: Vec<_> = all_tags
        .into_iter()
        .filter(|tag| validate::tag_violations(tag).is_empty())
        .collect();
    let invalid_tags = tag_total - tags.len();

    let primary_language = gitcmd::list_tracked_files(&repo_path)
        .ok()
        .and_then(|paths| parser::infer_primary_language(&paths));

    let authors = aggregate::aggregate_authors(&commits);
    let daily_stats = aggregate::aggregate_daily_stats(&commits);
    let summary = aggregate::summarize(&commits);

    let meta = RepoMetadata {
        name: repo_name.clone(),
        primary_language,
        is_archived: config.repos.archived.contains(&repo_name),
        last_commit_at: commits.first().map(|c| c.committed_at),
        total_commits: commits.len() as i64,
    };

    let batch_size = config.sync.file_change_batch_size;
    let repo = repo_name.clone();

    // The transaction future owns the records it loads; nothing here is
    // needed again after commit.
    let (commit_counters, change_counters, author_counters, stat_counters, tag_counters) =
        store::run_in_transaction(pool, move |conn| {
            Box::pin(async move {
                store::upsert_repo(conn, &meta).await?;
                let commit_counters = store::upsert_commits(conn, &commits).await?;
                let change_counters =
                    store::insert_file_changes(conn, &commits, batch_size, |n, total| {
                        progress.report(SyncProgressEvent::Loading {
                            repo: repo.clone(),
                            n,
                            total,
                        });
                    })
                    .await?;
                let author_counters = store::upsert_authors(conn, &authors).await?;
                let stat_counters = store::upsert_daily_stats(conn, &daily_stats).await?;
                let tag_counters = store::upsert_tags(conn, &tags).await?;
                Ok((
                    commit_counters,
                    change_counters,
                    author_counters,
                    stat_counters,
                    tag_counters,
                ))
            })
        })
        .await?;

    Ok(RepoReport {
        repo: repo_name,
        branch,
        parsed_commits: parsed_total,
        skipped_blocks: skipped.len(),
        invalid_commits,
        invalid_tags,
        filtered_commits,
        commits: commit_counters,
        file_changes: change_counters,
        authors: author_counters,
        daily_stats: stat_counters,
        tags: tag_counters,
        summary,
    })
}

fn apply_filter(
    commits: Vec<CommitRecord>,
    filter: Option<&CommitFilter>,
) -> (Vec<CommitRecord>, usize) {
    let Some(filter) = filter else {
        return (commits, 0);
    };

    let before = commits.len();
    let kept: Vec<_> = commits.into_iter().filter(|c| filter(c)).collect();
    let filtered = before - kept.len();
    (kept, filtered)
}

fn drop_invalid_commits(
    commits: Vec<CommitRecord>,
    repo_name: &str,
    strict: bool,
) -> Result<(Vec<CommitRecord>, usize)> {
    let mut valid = Vec::with_capacity(commits.len());
    let mut invalid = 0;

    for commit in commits {
        let violations = validate::commit_violations(&commit);
        if violations.is_empty() {
            valid.push(commit);
        } else if strict {
            bail!(
                "{}: commit {} failed validation: {}",
                repo_name,
                commit.hash,
                violations.join("; ")
            );
        } else {
            invalid += 1;
        }
    }

    Ok((valid, invalid))
}

/// Sync one repository (when `path` is given) or every configured repository.
///
/// In batch mode a repository's fatal error is reported on stderr and its
/// siblings still run; the call fails only when setup is invalid or every
/// repository failed.
pub async fn run_sync(
    config: &Config,
    path: Option<&Path>,
    filter: Option<&CommitFilter>,
    progress: Arc<dyn SyncProgressReporter>,
) -> Result<()> {
    let pool = db::connect(config).await?;

    let result = match path {
        Some(path) => {
            let report = sync_repository(&pool, config, path, filter, progress).await?;
            print_report(&report);
            Ok(())
        }
        None => run_batch(&pool, config, filter, progress).await,
    };

    pool.close().await;
    result
}

async fn run_batch(
    pool: &SqlitePool,
    config: &Config,
    filter: Option<&CommitFilter>,
    progress: Arc<dyn SyncProgressReporter>,
) -> Result<()> {
    if !config.has_repo_sources() {
        bail!("Config must list at least one of repos.paths or repos.scan_dirs");
    }

    let targets = collect_targets(config)?;

    if targets.is_empty() {
        bail!("No repositories found to sync");
    }

    let mut failures = 0usize;
    for target in &targets {
        match sync_repository(pool, config, target, filter, progress.clone()).await {
            Ok(report) => print_report(&report),
            Err(err) => {
                eprintln!("sync {} failed: {:#}", target.display(), err);
                failures += 1;
            }
        }
    }

    if failures == targets.len() {
        bail!("All {} repositories failed to sync", failures);
    }
    if failures > 0 {
        println!("done with {} failed of {} repositories", failures, targets.len());
    }
    Ok(())
}

/// Batch targets: explicit paths first, then discovered repositories, with
/// duplicates removed by canonical path. The same working copy listed under
/// `repos.paths` and found under a scan dir (or spelled two ways) syncs once.
fn collect_targets(config: &Config) -> Result<Vec<PathBuf>> {
    let mut raw: Vec<PathBuf> = config.repos.paths.clone();
    raw.extend(discover::scan_repos(config)?);

    let mut targets: Vec<PathBuf> = Vec::with_capacity(raw.len());
    for target in raw {
        // Nonexistent paths stay as spelled; sync_repository reports them.
        let canonical = target.canonicalize().unwrap_or(target);
        if !targets.contains(&canonical) {
            targets.push(canonical);
        }
    }
    Ok(targets)
}

fn print_report(report: &RepoReport) {
    println!("sync {} ({})", report.repo, report.branch);
    println!(
        "  commits: {} parsed, {} loaded",
        report.parsed_commits, report.commits.written
    );
    if report.skipped_blocks > 0 || report.invalid_commits > 0 || report.filtered_commits > 0 {
        println!(
            "  dropped: {} malformed, {} invalid, {} filtered",
            report.skipped_blocks, report.invalid_commits, report.filtered_commits
        );
    }
    println!(
        "  file changes: {} written, {} duplicate",
        report.file_changes.written, report.file_changes.duplicates
    );
    println!("  authors: {}", report.authors.written);
    println!("  daily stats: {}", report.daily_stats.written);
    if report.tags.written > 0 || report.invalid_tags > 0 {
        println!(
            "  tags: {} written, {} invalid",
            report.tags.written, report.invalid_tags
        );
    }
    if !report.summary.from_date.is_empty() {
        println!(
            "  range: {} to {} ({} merges, {} authors)",
            report.summary.from_date,
            report.summary.to_date,
            report.summary.merge_commits,
            report.summary.distinct_authors
        );
    }
    println!("ok");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn commit(email: &str, name: &str) -> CommitRecord {
        CommitRecord {
            repo: "demo".to_string(),
            hash: "abc1234".to_string(),
            author_email: email.to_string(),
            author_name: name.to_string(),
            committed_at: DateTime::from_timestamp(1000, 0).unwrap(),
            message: "msg".to_string(),
            additions: 0,
            deletions: 0,
            files_changed: 0,
            is_merge: false,
            branch: "main".to_string(),
            files: vec![],
        }
    }

    #[test]
    fn filter_keeps_matching_commits_and_counts_the_rest() {
        let commits = vec![
            commit("a@x.com", "A"),
            commit("bot@ci.example", "CI Bot"),
            commit("b@x.com", "B"),
        ];

        let keep_humans =
            |c: &CommitRecord| !c.author_name.contains("Bot") && !c.author_email.contains("bot");
        let (kept, filtered) = apply_filter(commits, Some(&keep_humans));

        assert_eq!(kept.len(), 2);
        assert_eq!(filtered, 1);
    }

    #[test]
    fn no_filter_keeps_everything() {
        let commits = vec![commit("a@x.com", "A")];
        let (kept, filtered) = apply_filter(commits, None);
        assert_eq!(kept.len(), 1);
        assert_eq!(filtered, 0);
    }

    #[test]
    fn invalid_commits_are_dropped_and_counted() {
        let mut bad = commit("not-an-email", "A");
        bad.hash = "zzz".to_string();
        let commits = vec![commit("a@x.com", "A"), bad];

        let (valid, invalid) = drop_invalid_commits(commits, "demo", false).unwrap();
        assert_eq!(valid.len(), 1);
        assert_eq!(invalid, 1);
    }

    #[test]
    fn strict_mode_fails_on_invalid_commit() {
        let bad = commit("not-an-email", "A");
        assert!(drop_invalid_commits(vec![bad], "demo", true).is_err());
    }

    use crate::config::{Config, DbConfig, ReposConfig, SyncConfig};
    use std::fs;

    fn source_config(paths: Vec<PathBuf>, scan_dirs: Vec<PathBuf>) -> Config {
        Config {
            db: DbConfig {
                path: PathBuf::from("/tmp/unused.sqlite"),
            },
            repos: ReposConfig {
                paths,
                scan_dirs,
                ignore: vec![],
                archived: vec![],
            },
            sync: SyncConfig::default(),
        }
    }

    #[test]
    fn batch_targets_collapse_explicit_and_discovered_duplicates() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = tmp.path().join("alpha");
        fs::create_dir_all(repo.join(".git")).unwrap();

        // The same working copy three ways: explicit, explicit with a
        // redundant spelling, and discoverable under the scan dir.
        let spelled = tmp.path().join(".").join("alpha");
        let config = source_config(
            vec![repo.clone(), spelled],
            vec![tmp.path().to_path_buf()],
        );

        let targets = collect_targets(&config).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0], repo.canonicalize().unwrap());
    }

    #[test]
    fn batch_targets_keep_distinct_repos() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["alpha", "beta"] {
            fs::create_dir_all(tmp.path().join(name).join(".git")).unwrap();
        }

        let config = source_config(vec![], vec![tmp.path().to_path_buf()]);
        assert_eq!(collect_targets(&config).unwrap().len(), 2);
    }
}
