//! Structural validation of parsed records.
//!
//! Each function returns the list of violated constraints (empty = valid)
//! without mutating or discarding anything. The pipeline decides what to do
//! with violations: drop-and-count by default, repo-fatal under strict mode.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{AuthorRecord, CommitRecord, TagRecord};

const MAX_NAME_LEN: usize = 255;
const MAX_EMAIL_LEN: usize = 255;
const MAX_MESSAGE_LEN: usize = 65_535;

fn sha_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9a-fA-F]{7,40}$").expect("valid sha regex"))
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex")
    })
}

fn check_sha(violations: &mut Vec<String>, field: &str, value: &str) {
    if !sha_pattern().is_match(value) {
        violations.push(format!("{}: must be 7-40 hex characters", field));
    }
}

fn check_email(violations: &mut Vec<String>, field: &str, value: &str) {
    if value.len() > MAX_EMAIL_LEN {
        violations.push(format!("{}: longer than {} characters", field, MAX_EMAIL_LEN));
    }
    if !email_pattern().is_match(value) {
        violations.push(format!("{}: not a valid email address", field));
    }
}

fn check_name(violations: &mut Vec<String>, field: &str, value: &str) {
    if value.is_empty() {
        violations.push(format!("{}: must not be empty", field));
    }
    if value.len() > MAX_NAME_LEN {
        violations.push(format!("{}: longer than {} characters", field, MAX_NAME_LEN));
    }
}

fn check_message(violations: &mut Vec<String>, field: &str, value: &str) {
    if value.len() > MAX_MESSAGE_LEN {
        violations.push(format!(
            "{}: longer than {} characters",
            field, MAX_MESSAGE_LEN
        ));
    }
}

fn check_non_negative(violations: &mut Vec<String>, field: &str, value: i64) {
    if value < 0 {
        violations.push(format!("{}: must be non-negative", field));
    }
}

/// Constraint violations for a parsed commit.
pub fn commit_violations(commit: &CommitRecord) -> Vec<String> {
    let mut violations = Vec::new();

    check_sha(&mut violations, "hash", &commit.hash);
    check_email(&mut violations, "author_email", &commit.author_email);
    check_name(&mut violations, "author_name", &commit.author_name);
    check_message(&mut violations, "message", &commit.message);
    check_non_negative(&mut violations, "additions", commit.additions);
    check_non_negative(&mut violations, "deletions", commit.deletions);
    check_non_negative(&mut violations, "files_changed", commit.files_changed);

    for file in &commit.files {
        check_non_negative(&mut violations, "file.additions", file.additions);
        check_non_negative(&mut violations, "file.deletions", file.deletions);
    }

    violations
}

/// Constraint violations for an aggregated author.
pub fn author_violations(author: &AuthorRecord) -> Vec<String> {
    let mut violations = Vec::new();

    check_email(&mut violations, "email", &author.email);
    check_name(&mut violations, "name", &author.name);

    if author.first_seen_at > author.last_seen_at {
        violations.push("first_seen_at: must not be after last_seen_at".to_string());
    }
    if author.total_commits < 1 {
        violations.push("total_commits: must be at least 1".to_string());
    }

    violations
}

/// Constraint violations for a parsed tag. Tagger fields are validated only
/// when present, which makes lightweight tags trivially valid.
pub fn tag_violations(tag: &TagRecord) -> Vec<String> {
    let mut violations = Vec::new();

    check_name(&mut violations, "name", &tag.name);
    check_sha(&mut violations, "target_hash", &tag.target_hash);

    if let Some(email) = &tag.tagger_email {
        check_email(&mut violations, "tagger_email", email);
    }
    if let Some(name) = &tag.tagger_name {
        check_name(&mut violations, "tagger_name", name);
    }
    if let Some(message) = &tag.message {
        check_message(&mut violations, "message", message);
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn valid_commit() -> CommitRecord {
        CommitRecord {
            repo: "demo".to_string(),
            hash: "abc1234".to_string(),
            author_email: "a@x.com".to_string(),
            author_name: "A".to_string(),
            committed_at: ts(1000),
            message: "hello".to_string(),
            additions: 5,
            deletions: 2,
            files_changed: 1,
            is_merge: false,
            branch: "main".to_string(),
            files: vec![],
        }
    }

    #[test]
    fn valid_commit_passes() {
        assert!(commit_violations(&valid_commit()).is_empty());
    }

    #[test]
    fn short_and_non_hex_hashes_are_rejected() {
        let mut commit = valid_commit();
        commit.hash = "abc12".to_string();
        assert_eq!(commit_violations(&commit).len(), 1);

        commit.hash = "zzzzzzzz".to_string();
        assert!(commit_violations(&commit)[0].contains("hash"));
    }

    #[test]
    fn bad_email_is_rejected() {
        let mut commit = valid_commit();
        commit.author_email = "not-an-email".to_string();
        assert!(!commit_violations(&commit).is_empty());

        commit.author_email = "a@nodot".to_string();
        assert!(!commit_violations(&commit).is_empty());
    }

    #[test]
    fn empty_name_and_negative_stats_are_rejected() {
        let mut commit = valid_commit();
        commit.author_name = String::new();
        commit.additions = -1;
        let violations = commit_violations(&commit);
        assert!(violations.iter().any(|v| v.contains("author_name")));
        assert!(violations.iter().any(|v| v.contains("additions")));
    }

    #[test]
    fn author_time_range_and_count_are_checked() {
        let author = AuthorRecord {
            email: "a@x.com".to_string(),
            name: "A".to_string(),
            first_seen_at: ts(2000),
            last_seen_at: ts(1000),
            total_commits: 0,
        };
        let violations = author_violations(&author);
        assert!(violations.iter().any(|v| v.contains("first_seen_at")));
        assert!(violations.iter().any(|v| v.contains("total_commits")));
    }

    #[test]
    fn lightweight_tag_with_no_optional_fields_is_valid() {
        let tag = TagRecord {
            repo: "demo".to_string(),
            name: "v1.0".to_string(),
            target_hash: "abc1234abc1234abc1234abc1234abc1234abc12".to_string(),
            is_annotated: false,
            tagger_name: None,
            tagger_email: None,
            tagged_at: None,
            message: None,
        };
        assert!(tag_violations(&tag).is_empty());
    }

    #[test]
    fn annotated_tag_optional_fields_are_validated_when_present() {
        let tag = TagRecord {
            repo: "demo".to_string(),
            name: "v2.0".to_string(),
            target_hash: "abc1234".to_string(),
            is_annotated: true,
            tagger_name: Some(String::new()),
            tagger_email: Some("bad".to_string()),
            tagged_at: None,
            message: Some("ok".to_string()),
        };
        let violations = tag_violations(&tag);
        assert!(violations.iter().any(|v| v.contains("tagger_name")));
        assert!(violations.iter().any(|v| v.contains("tagger_email")));
    }
}
