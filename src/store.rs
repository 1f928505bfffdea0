//! Idempotent upserts and the per-repository transaction boundary.
//!
//! Every entity is written with an insert-or-merge statement keyed on its
//! natural unique constraint. Merge rules differ per entity:
//!
//! | Table | On conflict |
//! |-------|-------------|
//! | `commits` | overwrite mutable fields, key `(repo, hash)` |
//! | `authors` | name latest-wins, first/last seen min/max, commit count accumulates |
//! | `file_changes` | ignore the duplicate row, key `(repo, hash, path)` |
//! | `tags` | overwrite, key `(repo, name)` |
//! | `daily_stats` | overwrite, key `(date, repo, author_email)` |
//! | `repos` | overwrite, key `name` |
//!
//! Duplicate-key conflicts are an expected outcome of this design: they are
//! counted, never surfaced as errors. All functions take a plain
//! `SqliteConnection` so they run identically inside or outside
//! [`run_in_transaction`].

use anyhow::Result;
use sqlx::{SqliteConnection, SqlitePool};
use std::future::Future;
use std::pin::Pin;

use crate::models::{
    AuthorRecord, CommitRecord, DailyStatRecord, FileChangeRecord, RepoMetadata, TagRecord,
};

/// Per-entity write outcome counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct WriteCounters {
    /// Rows inserted or updated.
    pub written: u64,
    /// Duplicate-key rows absorbed by the conflict clause.
    pub duplicates: u64,
}

/// Run `op` inside a single atomic unit: begin, execute, commit on normal
/// return, roll back and re-raise the original failure otherwise. No partial
/// writes from a failed operation are observable afterward. Transactions do
/// not nest; the pipeline opens at most one at a time.
pub async fn run_in_transaction<T, F>(pool: &SqlitePool, op: F) -> Result<T>
where
    F: for<'c> FnOnce(
        &'c mut SqliteConnection,
    ) -> Pin<Box<dyn Future<Output = Result<T>> + Send + 'c>>,
{
    let mut tx = pool.begin().await?;

    match op(&mut *tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            // Dropping the transaction would also roll back; an explicit
            // rollback failure must not mask the original error.
            let _ = tx.rollback().await;
            Err(err)
        }
    }
}

/// Insert or fully overwrite the repository metadata row.
pub async fn upsert_repo(conn: &mut SqliteConnection, meta: &RepoMetadata) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO repos (name, primary_language, is_archived, last_commit_at, total_commits)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(name) DO UPDATE SET
            primary_language = excluded.primary_language,
            is_archived = excluded.is_archived,
            last_commit_at = excluded.last_commit_at,
            total_commits = excluded.total_commits
        "#,
    )
    .bind(&meta.name)
    .bind(&meta.primary_language)
    .bind(meta.is_archived)
    .bind(meta.last_commit_at.map(|ts| ts.timestamp()))
    .bind(meta.total_commits)
    .execute(conn)
    .await?;

    Ok(())
}

/// Upsert commits keyed on `(repo, hash)`. Re-extraction overwrites the
/// mutable fields (author identity, message, stats) under the same key.
pub async fn upsert_commits(
    conn: &mut SqliteConnection,
    commits: &[CommitRecord],
) -> Result<WriteCounters> {
    let mut counters = WriteCounters::default();

    for commit in commits {
        sqlx::query(
            r#"
            INSERT INTO commits (repo, hash, author_email, author_name, committed_at,
                                 message, additions, deletions, files_changed, is_merge, branch)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(repo, hash) DO UPDATE SET
                author_email = excluded.author_email,
                author_name = excluded.author_name,
                committed_at = excluded.committed_at,
                message = excluded.message,
                additions = excluded.additions,
                deletions = excluded.deletions,
                files_changed = excluded.files_changed,
                is_merge = excluded.is_merge,
                branch = excluded.branch
            "#,
        )
        .bind(&commit.repo)
        .bind(&commit.hash)
        .bind(&commit.author_email)
        .bind(&commit.author_name)
        .bind(commit.committed_at.timestamp())
        .bind(&commit.message)
        .bind(commit.additions)
        .bind(commit.deletions)
        .bind(commit.files_changed)
        .bind(commit.is_merge)
        .bind(&commit.branch)
        .execute(&mut *conn)
        .await?;

        counters.written += 1;
    }

    Ok(counters)
}

/// Insert file changes in fixed-size batches, keyed on `(repo, hash, path)`.
/// Duplicate rows for the same key are silently dropped and counted, never
/// overwritten. `on_batch` fires after each batch with (rows done, total).
pub async fn insert_file_changes<F>(
    conn: &mut SqliteConnection,
    commits: &[CommitRecord],
    batch_size: usize,
    mut on_batch: F,
) -> Result<WriteCounters>
where
    F: FnMut(u64, u64),
{
    let rows: Vec<(&str, &str, &FileChangeRecord)> = commits
        .iter()
        .flat_map(|c| c.files.iter().map(move |f| (c.repo.as_str(), c.hash.as_str(), f)))
        .collect();

    let total = rows.len() as u64;
    let mut counters = WriteCounters::default();
    let mut done = 0u64;

    for batch in rows.chunks(batch_size.max(1)) {
        for (repo, hash, change) in batch {
            let result = sqlx::query(
                r#"
                INSERT INTO file_changes (repo, hash, path, additions, deletions)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(repo, hash, path) DO NOTHING
                "#,
            )
            .bind(repo)
            .bind(hash)
            .bind(&change.path)
            .bind(change.additions)
            .bind(change.deletions)
            .execute(&mut *conn)
            .await?;

            if result.rows_affected() == 0 {
                counters.duplicates += 1;
            } else {
                counters.written += 1;
            }
        }

        done += batch.len() as u64;
        on_batch(done, total);
    }

    Ok(counters)
}

/// Merge aggregated authors into storage, keyed on email. First-seen takes
/// the minimum across merges, last-seen the maximum, and `total_commits`
/// accumulates rather than resetting — re-running the ETL over the same
/// history adds to the stored count (see DESIGN.md).
pub async fn upsert_authors(
    conn: &mut SqliteConnection,
    authors: &[AuthorRecord],
) -> Result<WriteCounters> {
    let mut counters = WriteCounters::default();

    for author in authors {
        sqlx::query(
            r#"
            INSERT INTO authors (email, name, first_seen_at, last_seen_at, total_commits)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(email) DO UPDATE SET
                name = excluded.name,
                first_seen_at = MIN(authors.first_seen_at, excluded.first_seen_at),
                last_seen_at = MAX(authors.last_seen_at, excluded.last_seen_at),
                total_commits = authors.total_commits + excluded.total_commits
            "#,
        )
        .bind(&author.email)
        .bind(&author.name)
        .bind(author.first_seen_at.timestamp())
        .bind(author.last_seen_at.timestamp())
        .bind(author.total_commits)
        .execute(&mut *conn)
        .await?;

        counters.written += 1;
    }

    Ok(counters)
}

/// Upsert tags keyed on `(repo, name)`, fully overwriting mutable fields.
pub async fn upsert_tags(conn: &mut SqliteConnection, tags: &[TagRecord]) -> Result<WriteCounters> {
    let mut counters = WriteCounters::default();

    for tag in tags {
        sqlx::query(
            r#"
            INSERT INTO tags (repo, name, target_hash, is_annotated,
                              tagger_name, tagger_email, tagged_at, message)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(repo, name) DO UPDATE SET
                target_hash = excluded.target_hash,
                is_annotated = excluded.is_annotated,
                tagger_name = excluded.tagger_name,
                tagger_email = excluded.tagger_email,
                tagged_at = excluded.tagged_at,
                message = excluded.message
            "#,
        )
        .bind(&tag.repo)
        .bind(&tag.name)
        .bind(&tag.target_hash)
        .bind(tag.is_annotated)
        .bind(&tag.tagger_name)
        .bind(&tag.tagger_email)
        .bind(tag.tagged_at.map(|ts| ts.timestamp()))
        .bind(&tag.message)
        .execute(&mut *conn)
        .await?;

        counters.written += 1;
    }

    Ok(counters)
}

/// Upsert daily stats keyed on `(date, repo, author_email)`. Rebuilt and
/// overwritten each run — not additive like the author commit count.
pub async fn upsert_daily_stats(
    conn: &mut SqliteConnection,
    stats: &[DailyStatRecord],
) -> Result<WriteCounters> {
    let mut counters = WriteCounters::default();

    for stat in stats {
        sqlx::query(
            r#"
            INSERT INTO daily_stats (date, repo, author_email,
                                     commits_count, additions, deletions, files_changed)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(date, repo, author_email) DO UPDATE SET
                commits_count = excluded.commits_count,
                additions = excluded.additions,
                deletions = excluded.deletions,
                files_changed = excluded.files_changed
            "#,
        )
        .bind(&stat.date)
        .bind(&stat.repo)
        .bind(&stat.author_email)
        .bind(stat.commits_count)
        .bind(stat.additions)
        .bind(stat.deletions)
        .bind(stat.files_changed)
        .execute(&mut *conn)
        .await?;

        counters.written += 1;
    }

    Ok(counters)
}
