use anyhow::Result;

use crate::config::Config;
use crate::discover;

/// List configured repositories and scan directories with a health column,
/// so configuration problems surface before a sync.
pub fn list_sources(config: &Config) -> Result<()> {
    for line in source_lines(config) {
        println!("{}", line);
    }

    if config.has_repo_sources() {
        match discover::scan_repos(config) {
            Ok(found) => println!("\ndiscovered {} repositories under scan dirs", found.len()),
            Err(err) => println!("\ndiscovery failed: {:#}", err),
        }
    } else {
        println!("\nno repositories configured (set repos.paths or repos.scan_dirs)");
    }

    Ok(())
}

/// Header plus one row per configured source: path, kind, health verdict.
fn source_lines(config: &Config) -> Vec<String> {
    let mut lines = vec![format!("{:<48} {:<12} {}", "REPOSITORY", "KIND", "HEALTHY")];

    for path in &config.repos.paths {
        let healthy = path.is_dir() && path.join(".git").exists();
        lines.push(format!("{:<48} {:<12} {}", path.display(), "explicit", healthy));
    }

    for dir in &config.repos.scan_dirs {
        lines.push(format!(
            "{:<48} {:<12} {}",
            dir.display(),
            "scan dir",
            dir.is_dir()
        ));
    }

    lines
}
