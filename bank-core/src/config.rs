//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "app": { "databaseFile": "bank.duckdb", ... }
//! }
//! ```
//! Keys this crate does not manage are kept intact on save.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_DATABASE_FILE: &str = "bank.duckdb";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    database_file: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Bank configuration (the managed subset of settings.json)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Database file name, relative to the data directory
    pub database_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_file: DEFAULT_DATABASE_FILE.to_string(),
        }
    }
}

impl Config {
    /// Load config from the data directory; a missing file yields defaults
    pub fn load(bank_dir: &Path) -> Result<Self> {
        let raw = read_settings(bank_dir)?;
        Ok(Self {
            database_file: raw
                .app
                .database_file
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DATABASE_FILE.to_string()),
        })
    }

    /// Save config, preserving settings this crate doesn't manage
    pub fn save(&self, bank_dir: &Path) -> Result<()> {
        let mut settings = read_settings(bank_dir)?;
        settings.app.database_file = Some(self.database_file.clone());

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(bank_dir.join(SETTINGS_FILE), content)?;
        Ok(())
    }

    pub fn database_path(&self, bank_dir: &Path) -> PathBuf {
        bank_dir.join(&self.database_file)
    }
}

fn read_settings(bank_dir: &Path) -> Result<SettingsFile> {
    let settings_path = bank_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }

    let content = std::fs::read_to_string(&settings_path)?;
    Ok(serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring unreadable settings.json");
        SettingsFile::default()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.database_path(dir.path()), dir.path().join("bank.duckdb"));
    }

    #[test]
    fn test_reads_database_file() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"app": {"databaseFile": "other.duckdb"}}"#,
        )
        .unwrap();

        assert_eq!(Config::load(dir.path()).unwrap().database_file, "other.duckdb");
    }

    #[test]
    fn test_garbage_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "not json").unwrap();

        assert_eq!(Config::load(dir.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"app": {"theme": "dark"}, "extra": [1, 2]}"#,
        )
        .unwrap();

        let config = Config {
            database_file: "renamed.duckdb".to_string(),
        };
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["app"]["databaseFile"], "renamed.duckdb");
        assert_eq!(json["app"]["theme"], "dark");
        assert_eq!(json["extra"], serde_json::json!([1, 2]));
        assert_eq!(Config::load(dir.path()).unwrap(), config);
    }
}
