//! Git log and tag-ref parsing.
//!
//! Converts the raw text produced by [`crate::gitcmd`] into structured
//! records. Commit blocks are delimited by [`COMMIT_SENTINEL`]; each block is
//! six header lines (hash, author email, author name, epoch seconds, parent
//! hashes, subject) followed by zero or more `--numstat` lines. Blocks that
//! cannot yield the minimum header are dropped and reported as
//! [`SkipDiagnostic`]s rather than vanishing silently.

use chrono::DateTime;
use std::collections::HashMap;

use crate::gitcmd::COMMIT_SENTINEL;
use crate::models::{CommitRecord, FileChangeRecord, SkipDiagnostic, SkipReason, TagRecord};

/// Field separator in tag-ref records (`%1F`).
const TAG_FIELD_SEP: char = '\u{1f}';
/// Record separator between tag refs (`%1E`).
const TAG_RECORD_SEP: char = '\u{1e}';

/// Minimum header lines a commit block must carry.
const MIN_BLOCK_LINES: usize = 6;

/// Parse a sentinel-delimited commit log into records, most-recent-first as
/// emitted by `git log`. Returns the valid commits alongside diagnostics for
/// every dropped block.
pub fn parse_commit_log(
    raw: &str,
    repo: &str,
    branch: &str,
) -> (Vec<CommitRecord>, Vec<SkipDiagnostic>) {
    let mut commits = Vec::new();
    let mut skipped = Vec::new();

    // Only the leading newline from the sentinel boundary is trimmed; a
    // trailing empty line can be a legitimately empty subject.
    let blocks = raw
        .split(COMMIT_SENTINEL)
        .map(|b| b.trim_start_matches('\n'))
        .filter(|b| !b.is_empty());

    for (block_index, block) in blocks.enumerate() {
        match parse_block(block, repo, branch) {
            Ok(commit) => commits.push(commit),
            Err(reason) => skipped.push(SkipDiagnostic {
                block_index,
                reason,
            }),
        }
    }

    (commits, skipped)
}

fn parse_block(block: &str, repo: &str, branch: &str) -> Result<CommitRecord, SkipReason> {
    let lines: Vec<&str> = block.lines().collect();
    if lines.len() < MIN_BLOCK_LINES {
        return Err(SkipReason::TruncatedBlock);
    }

    let hash = lines[0].trim().to_string();
    let author_email = lines[1].trim().to_string();
    let author_name = lines[2].trim().to_string();

    let epoch: i64 = lines[3]
        .trim()
        .parse()
        .map_err(|_| SkipReason::BadTimestamp)?;
    let committed_at = DateTime::from_timestamp(epoch, 0).ok_or(SkipReason::BadTimestamp)?;

    let parent_count = lines[4].split_whitespace().count();
    let message = lines[5].to_string();

    let mut additions = 0i64;
    let mut deletions = 0i64;
    let mut files = Vec::new();

    for line in &lines[MIN_BLOCK_LINES..] {
        if let Some(change) = parse_numstat_line(line) {
            additions += change.additions;
            deletions += change.deletions;
            files.push(change);
        }
    }

    Ok(CommitRecord {
        repo: repo.to_string(),
        hash,
        author_email,
        author_name,
        committed_at,
        message,
        additions,
        deletions,
        files_changed: files.len() as i64,
        is_merge: parent_count > 1,
        branch: branch.to_string(),
        files,
    })
}

/// Parse one `added<TAB>deleted<TAB>path` numstat line. The `-` marker for
/// binary files contributes zero to the numeric totals but still counts as
/// one changed file.
fn parse_numstat_line(line: &str) -> Option<FileChangeRecord> {
    let mut parts = line.splitn(3, '\t');
    let added = parts.next()?.trim();
    let deleted = parts.next()?.trim();
    let path = parts.next()?.trim();

    if path.is_empty() {
        return None;
    }

    Some(FileChangeRecord {
        path: path.to_string(),
        additions: added.parse().unwrap_or(0),
        deletions: deleted.parse().unwrap_or(0),
    })
}

/// Parse `for-each-ref` output into tag records.
///
/// Object type `tag` marks an annotated tag, which carries tagger identity
/// and a message (subject plus optional body, joined by a blank line).
/// Object type `commit` is a lightweight tag: a bare pointer with no tagger
/// fields. Malformed records are dropped; tag extraction degrades rather
/// than aborting a repository.
pub fn parse_tag_refs(raw: &str, repo: &str) -> Vec<TagRecord> {
    raw.split(TAG_RECORD_SEP)
        .filter_map(|record| parse_tag_record(record, repo))
        .collect()
}

fn parse_tag_record(record: &str, repo: &str) -> Option<TagRecord> {
    let record = record.trim_start_matches('\n');
    if record.trim().is_empty() {
        return None;
    }

    let fields: Vec<&str> = record.split(TAG_FIELD_SEP).collect();
    if fields.len() < 9 {
        return None;
    }

    let name = fields[0].trim().to_string();
    if name.is_empty() {
        return None;
    }

    let object_type = fields[1].trim();
    let object_name = fields[2].trim();
    let peeled = fields[3].trim();
    let is_annotated = object_type == "tag";

    // Annotated tags point at a tag object; the commit they reference is the
    // peeled object name.
    let target_hash = if is_annotated && !peeled.is_empty() {
        peeled.to_string()
    } else {
        object_name.to_string()
    };

    if !is_annotated {
        return Some(TagRecord {
            repo: repo.to_string(),
            name,
            target_hash,
            is_annotated: false,
            tagger_name: None,
            tagger_email: None,
            tagged_at: None,
            message: None,
        });
    }

    let tagger_name = non_empty(fields[4].trim());
    let tagger_email = non_empty(strip_angle_brackets(fields[5].trim()));
    let tagged_at = fields[6]
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|ts| *ts > 0)
        .and_then(|ts| DateTime::from_timestamp(ts, 0));

    let subject = fields[7].trim();
    let body = fields[8].trim();
    let message = if body.is_empty() {
        subject.to_string()
    } else {
        format!("{}\n\n{}", subject, body)
    };

    Some(TagRecord {
        repo: repo.to_string(),
        name,
        target_hash,
        is_annotated: true,
        tagger_name,
        tagger_email,
        tagged_at,
        message: Some(message),
    })
}

fn strip_angle_brackets(email: &str) -> &str {
    email
        .strip_prefix('<')
        .and_then(|e| e.strip_suffix('>'))
        .unwrap_or(email)
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Known file extensions and the language they indicate.
const LANGUAGE_TABLE: &[(&str, &str)] = &[
    ("ts", "TypeScript"),
    ("tsx", "TypeScript"),
    ("js", "JavaScript"),
    ("jsx", "JavaScript"),
    ("rs", "Rust"),
    ("py", "Python"),
    ("go", "Go"),
    ("java", "Java"),
    ("rb", "Ruby"),
    ("c", "C"),
    ("h", "C"),
    ("cpp", "C++"),
    ("cc", "C++"),
    ("cxx", "C++"),
    ("hpp", "C++"),
    ("cs", "C#"),
    ("php", "PHP"),
    ("swift", "Swift"),
    ("kt", "Kotlin"),
    ("kts", "Kotlin"),
    ("scala", "Scala"),
    ("sh", "Shell"),
    ("bash", "Shell"),
    ("html", "HTML"),
    ("css", "CSS"),
    ("ex", "Elixir"),
    ("exs", "Elixir"),
    ("erl", "Erlang"),
    ("hs", "Haskell"),
    ("lua", "Lua"),
    ("pl", "Perl"),
    ("r", "R"),
    ("dart", "Dart"),
    ("vue", "Vue"),
    ("sql", "SQL"),
];

/// Infer the repository's primary language by counting known file extensions
/// across tracked paths. Returns the language with the highest matching file
/// count (ties broken by name for determinism), or `None` when no extension
/// matches.
pub fn infer_primary_language(paths: &[String]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for path in paths {
        let ext = match path.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => continue,
        };
        if let Some(&(_, language)) = LANGUAGE_TABLE.iter().find(|(e, _)| *e == ext) {
            *counts.entry(language).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(language, _)| language.to_string())
}
