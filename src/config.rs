use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub repos: ReposConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Which repositories to load: explicit paths, directories to scan for
/// working copies, ignore patterns over discovered paths, and repository
/// names to flag as archived.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReposConfig {
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub scan_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub archived: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// File-change rows written per batch. Purely a throughput/observability
    /// knob; batching has no semantic effect.
    #[serde(default = "default_batch_size")]
    pub file_change_batch_size: usize,
    /// Optional substring matched against author name/email; matching commits
    /// are skipped by the batch driver.
    #[serde(default)]
    pub author_filter: Option<String>,
    /// Treat any validation violation as a repository-fatal error.
    #[serde(default)]
    pub strict: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            file_change_batch_size: default_batch_size(),
            author_filter: None,
            strict: false,
        }
    }
}

fn default_batch_size() -> usize {
    1000
}

impl Config {
    /// Minimal config for single-repository mode when no config file exists:
    /// a local database and nothing else.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/gitledger.sqlite"),
            },
            repos: ReposConfig::default(),
            sync: SyncConfig::default(),
        }
    }

    /// True when batch mode has at least one repository source configured.
    pub fn has_repo_sources(&self) -> bool {
        !self.repos.paths.is_empty() || !self.repos.scan_dirs.is_empty()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Load the config file, falling back to [`Config::minimal`] only when the
/// file does not exist. A file that exists but fails to parse or validate is
/// an error, never silently replaced by defaults.
pub fn load_config_or_minimal(path: &Path) -> Result<Config> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content)
            .with_context(|| format!("Invalid config file: {}", path.display())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Config::minimal()),
        Err(err) => {
            Err(err).with_context(|| format!("Failed to read config file: {}", path.display()))
        }
    }
}

fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.sync.file_change_batch_size == 0 {
        anyhow::bail!("sync.file_change_batch_size must be > 0");
    }

    if let Some(filter) = &config.sync.author_filter {
        if filter.is_empty() {
            anyhow::bail!("sync.author_filter must not be empty when set");
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_full_config() {
        let file = write_config(
            r#"
[db]
path = "./data/ledger.sqlite"

[repos]
paths = ["/tmp/a"]
scan_dirs = ["/tmp/projects"]
ignore = ["**/archive/**"]
archived = ["legacy"]

[sync]
file_change_batch_size = 500
author_filter = "bot"
strict = true
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.repos.paths.len(), 1);
        assert_eq!(config.repos.scan_dirs.len(), 1);
        assert_eq!(config.repos.archived, vec!["legacy".to_string()]);
        assert_eq!(config.sync.file_change_batch_size, 500);
        assert_eq!(config.sync.author_filter.as_deref(), Some("bot"));
        assert!(config.sync.strict);
        assert!(config.has_repo_sources());
    }

    #[test]
    fn defaults_apply_when_sections_missing() {
        let file = write_config("[db]\npath = \"./ledger.sqlite\"\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.sync.file_change_batch_size, 1000);
        assert!(config.sync.author_filter.is_none());
        assert!(!config.sync.strict);
        assert!(!config.has_repo_sources());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let file = write_config(
            "[db]\npath = \"./ledger.sqlite\"\n[sync]\nfile_change_batch_size = 0\n",
        );
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn missing_config_file_falls_back_to_minimal() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_or_minimal(&dir.path().join("gitledger.toml")).unwrap();
        assert_eq!(config.db.path, PathBuf::from("./data/gitledger.sqlite"));
    }

    #[test]
    fn malformed_config_file_is_an_error_not_a_fallback() {
        let file = write_config("[db]\npath = 123\n");
        assert!(load_config_or_minimal(file.path()).is_err());
    }

    #[test]
    fn invalid_values_propagate_through_the_fallback_loader() {
        let file = write_config(
            "[db]\npath = \"./ledger.sqlite\"\n[sync]\nfile_change_batch_size = 0\n",
        );
        assert!(load_config_or_minimal(file.path()).is_err());
    }
}
