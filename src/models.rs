//! Core data models used throughout gitledger.
//!
//! These types represent the commits, tags, and derived aggregates that flow
//! through the extract-transform-load pipeline. Parser output is owned by a
//! single run and discarded once the repository's transaction commits or
//! rolls back; the SQLite rows are the durable representation.

use chrono::{DateTime, Utc};

/// A single commit parsed from the git log of one repository.
///
/// Identity is `(repo, hash)`. Records are immutable after parsing; on
/// re-extraction the stored row is overwritten field-by-field under the same
/// key.
#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub repo: String,
    pub hash: String,
    pub author_email: String,
    pub author_name: String,
    pub committed_at: DateTime<Utc>,
    pub message: String,
    pub additions: i64,
    pub deletions: i64,
    pub files_changed: i64,
    /// True when the commit has more than one parent.
    pub is_merge: bool,
    pub branch: String,
    /// Per-file changes in log order.
    pub files: Vec<FileChangeRecord>,
}

/// One file touched by a commit. Binary files carry zero additions/deletions
/// but still count as a changed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeRecord {
    pub path: String,
    pub additions: i64,
    pub deletions: i64,
}

/// Aggregated per-author activity, derived by folding over a repository's
/// commits. Persisted by merging with any prior stored row: first-seen takes
/// the minimum, last-seen the maximum, and `total_commits` accumulates.
#[derive(Debug, Clone)]
pub struct AuthorRecord {
    pub email: String,
    /// Display name from the most recently folded commit.
    pub name: String,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub total_commits: i64,
}

/// A git tag. Annotated tags carry their own tagger identity and message;
/// lightweight tags are bare pointers and leave those fields empty.
#[derive(Debug, Clone)]
pub struct TagRecord {
    pub repo: String,
    pub name: String,
    pub target_hash: String,
    pub is_annotated: bool,
    pub tagger_name: Option<String>,
    pub tagger_email: Option<String>,
    pub tagged_at: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

/// Per-day, per-author, per-repository activity rollup. Keyed on
/// `(date, repo, author_email)` where `date` is the UTC calendar date in
/// `YYYY-MM-DD` form. Rebuilt and overwritten on every run.
#[derive(Debug, Clone)]
pub struct DailyStatRecord {
    pub date: String,
    pub repo: String,
    pub author_email: String,
    pub commits_count: i64,
    pub additions: i64,
    pub deletions: i64,
    pub files_changed: i64,
}

/// Repository-level metadata, fully overwritten on every run.
#[derive(Debug, Clone)]
pub struct RepoMetadata {
    pub name: String,
    pub primary_language: Option<String>,
    pub is_archived: bool,
    pub last_commit_at: Option<DateTime<Utc>>,
    pub total_commits: i64,
}

/// Why a commit block was excluded from parser output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Block had fewer than the six required header lines.
    TruncatedBlock,
    /// The timestamp line was not an integer.
    BadTimestamp,
}

/// Diagnostic for a dropped commit block, so callers can log or fail strict
/// instead of losing records silently.
#[derive(Debug, Clone)]
pub struct SkipDiagnostic {
    /// Zero-based index of the block within the raw log text.
    pub block_index: usize,
    pub reason: SkipReason,
}

/// Whole-run rollup across a repository's parsed commits.
///
/// `from_date`/`to_date` are UTC calendar dates (`YYYY-MM-DD`); since the log
/// is most-recent-first, `from_date` comes from the last element and
/// `to_date` from the first. Both are empty strings for an empty commit list.
#[derive(Debug, Clone, Default)]
pub struct ExtractSummary {
    pub total_commits: i64,
    pub total_additions: i64,
    pub total_deletions: i64,
    pub total_files_changed: i64,
    pub merge_commits: i64,
    pub distinct_authors: i64,
    pub from_date: String,
    pub to_date: String,
}
