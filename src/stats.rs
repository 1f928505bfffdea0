//! Database statistics and health overview.
//!
//! Provides a quick summary of what's loaded: commit, author, tag, and
//! daily-stat counts with a per-repository breakdown. Used by
//! `gitledger stats` to give confidence that syncs are working as expected.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;

/// Per-repository breakdown of loaded history.
struct RepoStats {
    name: String,
    primary_language: Option<String>,
    commit_count: i64,
    author_count: i64,
    tag_count: i64,
    last_commit_at: Option<i64>,
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let total_repos: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM repos")
        .fetch_one(&pool)
        .await?;
    let total_commits: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM commits")
        .fetch_one(&pool)
        .await?;
    let total_authors: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM authors")
        .fetch_one(&pool)
        .await?;
    let total_tags: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
        .fetch_one(&pool)
        .await?;
    let total_daily: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM daily_stats")
        .fetch_one(&pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("gitledger — Database Stats");
    println!("==========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Repos:       {}", total_repos);
    println!("  Commits:     {}", total_commits);
    println!("  Authors:     {}", total_authors);
    println!("  Tags:        {}", total_tags);
    println!("  Daily stats: {}", total_daily);

    let repo_rows = sqlx::query(
        r#"
        SELECT
            r.name,
            r.primary_language,
            r.last_commit_at,
            COUNT(DISTINCT c.hash) AS commit_count,
            COUNT(DISTINCT c.author_email) AS author_count,
            COUNT(DISTINCT t.name) AS tag_count
        FROM repos r
        LEFT JOIN commits c ON c.repo = r.name
        LEFT JOIN tags t ON t.repo = r.name
        GROUP BY r.name
        ORDER BY commit_count DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let repo_stats: Vec<RepoStats> = repo_rows
        .iter()
        .map(|row| RepoStats {
            name: row.get("name"),
            primary_language: row.get("primary_language"),
            commit_count: row.get("commit_count"),
            author_count: row.get("author_count"),
            tag_count: row.get("tag_count"),
            last_commit_at: row.get("last_commit_at"),
        })
        .collect();

    if !repo_stats.is_empty() {
        println!();
        println!("  By repository:");
        println!(
            "  {:<24} {:<12} {:>8} {:>8} {:>6}   {}",
            "REPO", "LANGUAGE", "COMMITS", "AUTHORS", "TAGS", "LAST COMMIT"
        );
        println!("  {}", "-".repeat(76));

        for s in &repo_stats {
            let last_display = match s.last_commit_at {
                Some(ts) => format_ts_relative(ts),
                None => "never".to_string(),
            };
            println!(
                "  {:<24} {:<12} {:>8} {:>8} {:>6}   {}",
                s.name,
                s.primary_language.as_deref().unwrap_or("-"),
                s.commit_count,
                s.author_count,
                s.tag_count,
                last_display
            );
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
