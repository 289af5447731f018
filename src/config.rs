//! `macsync.toml`: where the store lives and which member file to sync.
//!
//! Every field is optional. A command-line argument beats the file, and the
//! file beats the built-in default. The store identity is not configurable.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Member file expected inside the MAC archive
pub const DEFAULT_MEMBER: &str = "alpha.v3.txt";

pub const DEFAULT_CONFIG_FILE: &str = "macsync.toml";
pub const DEFAULT_DATABASE_FILE: &str = "macsync.db";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct MacsyncConfig {
    pub database: Option<String>,
    pub source: Option<String>,
    pub member: Option<String>,
}

impl MacsyncConfig {
    /// Read the config at `path` (default `macsync.toml`); a missing file
    /// yields the empty config.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    /// Write this config to `path`; an existing file is kept unless `force`.
    pub fn save(&self, path: &Path, force: bool) -> anyhow::Result<()> {
        if path.exists() && !force {
            anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
        }

        std::fs::write(path, toml::to_string_pretty(self)?)
            .with_context(|| format!("writing {}", path.display()))
    }

    /// Store path: explicit argument, then config, then default
    pub fn database_path(&self, arg: Option<PathBuf>) -> PathBuf {
        arg.or_else(|| self.database.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_FILE))
    }

    pub fn source_path(&self, arg: Option<PathBuf>) -> Option<PathBuf> {
        arg.or_else(|| self.source.as_ref().map(PathBuf::from))
    }

    pub fn member_name(&self, arg: Option<String>) -> String {
        arg.or_else(|| self.member.clone())
            .unwrap_or_else(|| DEFAULT_MEMBER.to_string())
    }
}

/// Create the directory that will hold the store file.
pub fn ensure_parent_dir(db_path: &Path) -> anyhow::Result<()> {
    match db_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_is_default() {
        let dir = TempDir::new().unwrap();
        let loaded = MacsyncConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(loaded, MacsyncConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        let config = MacsyncConfig {
            database: Some("data/mac.db".into()),
            source: None,
            member: Some("alpha.v3.txt".into()),
        };

        config.save(&path, false).unwrap();
        assert_eq!(MacsyncConfig::load(Some(&path)).unwrap(), config);

        assert!(config.save(&path, false).is_err());
        config.save(&path, true).unwrap();
    }

    #[test]
    fn test_malformed_config_names_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "database = [").unwrap();

        let err = MacsyncConfig::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn test_precedence() {
        let config = MacsyncConfig {
            database: Some("from-config.db".into()),
            source: Some("from-config.txt".into()),
            member: None,
        };

        assert_eq!(
            config.database_path(Some(PathBuf::from("arg.db"))),
            PathBuf::from("arg.db")
        );
        assert_eq!(config.database_path(None), PathBuf::from("from-config.db"));
        assert_eq!(
            MacsyncConfig::default().database_path(None),
            PathBuf::from(DEFAULT_DATABASE_FILE)
        );
        assert_eq!(config.source_path(None), Some(PathBuf::from("from-config.txt")));
        assert_eq!(config.member_name(None), DEFAULT_MEMBER);
        assert_eq!(config.member_name(Some("other.txt".into())), "other.txt");
    }

    #[test]
    fn test_ensure_parent_dir() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("nested").join("store").join("macsync.db");
        ensure_parent_dir(&db).unwrap();
        assert!(db.parent().unwrap().is_dir());

        ensure_parent_dir(Path::new("macsync.db")).unwrap();
    }
}
