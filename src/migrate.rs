use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create all tables and indexes. Every statement is idempotent, so running
/// migrations repeatedly is safe.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS repos (
            name TEXT PRIMARY KEY,
            primary_language TEXT,
            is_archived INTEGER NOT NULL DEFAULT 0,
            last_commit_at INTEGER,
            total_commits INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS commits (
            repo TEXT NOT NULL,
            hash TEXT NOT NULL,
            author_email TEXT NOT NULL,
            author_name TEXT NOT NULL,
            committed_at INTEGER NOT NULL,
            message TEXT NOT NULL,
            additions INTEGER NOT NULL DEFAULT 0,
            deletions INTEGER NOT NULL DEFAULT 0,
            files_changed INTEGER NOT NULL DEFAULT 0,
            is_merge INTEGER NOT NULL DEFAULT 0,
            branch TEXT NOT NULL,
            UNIQUE(repo, hash)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS authors (
            email TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            first_seen_at INTEGER NOT NULL,
            last_seen_at INTEGER NOT NULL,
            total_commits INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS file_changes (
            repo TEXT NOT NULL,
            hash TEXT NOT NULL,
            path TEXT NOT NULL,
            additions INTEGER NOT NULL DEFAULT 0,
            deletions INTEGER NOT NULL DEFAULT 0,
            UNIQUE(repo, hash, path)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            repo TEXT NOT NULL,
            name TEXT NOT NULL,
            target_hash TEXT NOT NULL,
            is_annotated INTEGER NOT NULL DEFAULT 0,
            tagger_name TEXT,
            tagger_email TEXT,
            tagged_at INTEGER,
            message TEXT,
            UNIQUE(repo, name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS daily_stats (
            date TEXT NOT NULL,
            repo TEXT NOT NULL,
            author_email TEXT NOT NULL,
            commits_count INTEGER NOT NULL DEFAULT 0,
            additions INTEGER NOT NULL DEFAULT 0,
            deletions INTEGER NOT NULL DEFAULT 0,
            files_changed INTEGER NOT NULL DEFAULT 0,
            UNIQUE(date, repo, author_email)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_commits_author_email ON commits(author_email)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_commits_committed_at ON commits(committed_at DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_file_changes_repo_hash ON file_changes(repo, hash)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_daily_stats_repo ON daily_stats(repo)")
        .execute(pool)
        .await?;

    Ok(())
}
