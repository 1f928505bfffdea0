//! External `git` command interface.
//!
//! Every function shells out to the `git` binary with captured stdout/stderr.
//! A non-zero exit is surfaced as an error carrying the trimmed stderr text.
//! Callers decide which failures are fatal: branch resolution and log reads
//! abort the repository, while tag listing and tracked-file listing are
//! allowed to degrade.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;

/// Sentinel emitted at the start of every commit block in [`read_log`] output.
pub const COMMIT_SENTINEL: &str = "@@COMMIT@@";

/// Log format: sentinel, then one line each of hash, author email, author
/// name, epoch seconds, parent hashes, subject. `--numstat` appends one
/// `added<TAB>deleted<TAB>path` line per touched file.
const LOG_FORMAT: &str = "@@COMMIT@@%n%H%n%ae%n%an%n%ct%n%P%n%s";

/// Tag format: unit-separated fields, record-separated refs. `%(*objectname)`
/// is the peeled commit for annotated tags and empty for lightweight ones.
const TAG_FORMAT: &str = "%(refname:short)%1F%(objecttype)%1F%(objectname)%1F%(*objectname)%1F%(taggername)%1F%(taggeremail)%1F%(taggerdate:unix)%1F%(subject)%1F%(body)%1E";

/// Resolve the currently checked-out branch name.
pub fn resolve_current_branch(repo_path: &Path) -> Result<String> {
    let stdout = run_git(repo_path, &["rev-parse", "--abbrev-ref", "HEAD"])
        .with_context(|| format!("Failed to resolve branch for {}", repo_path.display()))?;

    let branch = stdout.trim().to_string();
    if branch.is_empty() {
        bail!("git rev-parse returned an empty branch name");
    }
    Ok(branch)
}

/// Read the raw commit log for a branch, sentinel-delimited with numstat
/// lines. The full log is captured in memory; parsing happens in
/// [`crate::parser`].
pub fn read_log(repo_path: &Path, branch: &str) -> Result<String> {
    let format_arg = format!("--format={}", LOG_FORMAT);
    run_git(repo_path, &["log", branch, &format_arg, "--numstat"])
        .with_context(|| format!("Failed to read git log for {}", repo_path.display()))
}

/// List all tracked file paths at HEAD.
pub fn list_tracked_files(repo_path: &Path) -> Result<Vec<String>> {
    let stdout = run_git(repo_path, &["ls-files"])?;
    Ok(stdout.lines().map(|l| l.to_string()).collect())
}

/// Read raw tag-ref records for the repository (annotated and lightweight).
pub fn list_tag_refs(repo_path: &Path) -> Result<String> {
    let format_arg = format!("--format={}", TAG_FORMAT);
    run_git(repo_path, &["for-each-ref", "refs/tags", &format_arg])
}

fn run_git(repo_path: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .output()
        .with_context(|| format!("Failed to execute 'git {}'. Is git installed?", args[0]))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git {} failed: {}", args[0], stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
