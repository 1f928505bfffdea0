//! Derivation of author, daily-stat, and summary aggregates from parsed
//! commits.
//!
//! All aggregation is a pure fold over the commit list in log order
//! (most-recent-first as produced by the parser). Grouped outputs use
//! `BTreeMap` keys so the resulting vectors are deterministic.

use std::collections::{BTreeMap, HashSet};

use crate::models::{AuthorRecord, CommitRecord, DailyStatRecord, ExtractSummary};

/// Fold commits into per-author activity records, grouped by email.
///
/// The first commit folded for an email sets first-seen = last-seen = its
/// timestamp with a count of 1; every subsequent commit for that email takes
/// that commit's display name, extends the seen range downward/upward, and
/// increments the count.
pub fn aggregate_authors(commits: &[CommitRecord]) -> Vec<AuthorRecord> {
    let mut authors: BTreeMap<String, AuthorRecord> = BTreeMap::new();

    for commit in commits {
        match authors.get_mut(&commit.author_email) {
            Some(author) => {
                author.name = commit.author_name.clone();
                author.first_seen_at = author.first_seen_at.min(commit.committed_at);
                author.last_seen_at = author.last_seen_at.max(commit.committed_at);
                author.total_commits += 1;
            }
            None => {
                authors.insert(
                    commit.author_email.clone(),
                    AuthorRecord {
                        email: commit.author_email.clone(),
                        name: commit.author_name.clone(),
                        first_seen_at: commit.committed_at,
                        last_seen_at: commit.committed_at,
                        total_commits: 1,
                    },
                );
            }
        }
    }

    authors.into_values().collect()
}

/// Group commits by (UTC calendar date, repo, author email) and sum commit
/// count, additions, deletions, and files changed per group.
pub fn aggregate_daily_stats(commits: &[CommitRecord]) -> Vec<DailyStatRecord> {
    let mut stats: BTreeMap<(String, String, String), DailyStatRecord> = BTreeMap::new();

    for commit in commits {
        let date = commit.committed_at.date_naive().format("%Y-%m-%d").to_string();
        let key = (
            date.clone(),
            commit.repo.clone(),
            commit.author_email.clone(),
        );

        let entry = stats.entry(key).or_insert_with(|| DailyStatRecord {
            date,
            repo: commit.repo.clone(),
            author_email: commit.author_email.clone(),
            commits_count: 0,
            additions: 0,
            deletions: 0,
            files_changed: 0,
        });

        entry.commits_count += 1;
        entry.additions += commit.additions;
        entry.deletions += commit.deletions;
        entry.files_changed += commit.files_changed;
    }

    stats.into_values().collect()
}

/// Compute the whole-run summary over a repository's commit set.
///
/// The log is most-recent-first, so the date range's `from` is the calendar
/// date of the last element and `to` the date of the first. An empty commit
/// list yields empty-string bounds.
pub fn summarize(commits: &[CommitRecord]) -> ExtractSummary {
    let mut summary = ExtractSummary::default();
    let mut authors = HashSet::new();

    for commit in commits {
        summary.total_commits += 1;
        summary.total_additions += commit.additions;
        summary.total_deletions += commit.deletions;
        summary.total_files_changed += commit.files_changed;
        if commit.is_merge {
            summary.merge_commits += 1;
        }
        authors.insert(commit.author_email.as_str());
    }

    summary.distinct_authors = authors.len() as i64;

    if let (Some(first), Some(last)) = (commits.first(), commits.last()) {
        summary.to_date = first.committed_at.date_naive().format("%Y-%m-%d").to_string();
        summary.from_date = last.committed_at.date_naive().format("%Y-%m-%d").to_string();
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn commit(email: &str, name: &str, secs: i64, additions: i64) -> CommitRecord {
        CommitRecord {
            repo: "demo".to_string(),
            hash: format!("{:040x}", secs),
            author_email: email.to_string(),
            author_name: name.to_string(),
            committed_at: DateTime::from_timestamp(secs, 0).unwrap(),
            message: "msg".to_string(),
            additions,
            deletions: 1,
            files_changed: 1,
            is_merge: false,
            branch: "main".to_string(),
            files: vec![],
        }
    }

    const DAY: i64 = 86_400;

    #[test]
    fn author_fold_tracks_range_name_and_count() {
        // Most-recent-first, two authors, one of them twice.
        let commits = vec![
            commit("a@x.com", "A Newer", 3 * DAY, 3),
            commit("b@x.com", "B", 2 * DAY, 1),
            commit("a@x.com", "A Older", DAY, 4),
        ];

        let authors = aggregate_authors(&commits);
        assert_eq!(authors.len(), 2);

        let a = &authors[0];
        assert_eq!(a.email, "a@x.com");
        // Name comes from the most recently folded commit for that email.
        assert_eq!(a.name, "A Older");
        assert_eq!(a.first_seen_at.timestamp(), DAY);
        assert_eq!(a.last_seen_at.timestamp(), 3 * DAY);
        assert_eq!(a.total_commits, 2);

        let b = &authors[1];
        assert_eq!(b.email, "b@x.com");
        assert_eq!(b.total_commits, 1);
        assert_eq!(b.first_seen_at, b.last_seen_at);
    }

    #[test]
    fn same_day_commits_collapse_into_one_daily_stat() {
        // Two commits by the same author on the same UTC date.
        let commits = vec![
            commit("a@x.com", "A", 10 * DAY + 3600, 3),
            commit("a@x.com", "A", 10 * DAY + 60, 4),
        ];

        let stats = aggregate_daily_stats(&commits);
        assert_eq!(stats.len(), 1);
        let stat = &stats[0];
        assert_eq!(stat.date, "1970-01-11");
        assert_eq!(stat.commits_count, 2);
        assert_eq!(stat.additions, 7);
        assert_eq!(stat.deletions, 2);
        assert_eq!(stat.files_changed, 2);
    }

    #[test]
    fn different_dates_and_authors_stay_separate() {
        let commits = vec![
            commit("a@x.com", "A", 10 * DAY, 1),
            commit("b@x.com", "B", 10 * DAY, 1),
            commit("a@x.com", "A", 9 * DAY, 1),
        ];

        let stats = aggregate_daily_stats(&commits);
        assert_eq!(stats.len(), 3);
    }

    #[test]
    fn summary_totals_and_date_range() {
        let mut newest = commit("a@x.com", "A", 12 * DAY, 10);
        newest.is_merge = true;
        let commits = vec![
            newest,
            commit("b@x.com", "B", 11 * DAY, 5),
            commit("a@x.com", "A", 10 * DAY, 2),
        ];

        let summary = summarize(&commits);
        assert_eq!(summary.total_commits, 3);
        assert_eq!(summary.total_additions, 17);
        assert_eq!(summary.total_deletions, 3);
        assert_eq!(summary.total_files_changed, 3);
        assert_eq!(summary.merge_commits, 1);
        assert_eq!(summary.distinct_authors, 2);
        assert_eq!(summary.from_date, "1970-01-11");
        assert_eq!(summary.to_date, "1970-01-13");
    }

    #[test]
    fn empty_commit_list_yields_empty_bounds() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_commits, 0);
        assert_eq!(summary.from_date, "");
        assert_eq!(summary.to_date, "");
    }
}
