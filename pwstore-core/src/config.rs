//! Configuration management
//!
//! Settings live in `settings.json` inside the store directory:
//! ```json
//! {
//!   "databasePath": "/home/me/passwds.gpg",
//!   "backupCount": 5,
//!   "recipient": "me@example.com",
//!   "gpgProgram": "gpg2"
//! }
//! ```
//! Every field is optional. Environment variables override the file, and
//! command-line flags (applied by the CLI) override both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::gpg::{GpgBackend, DEFAULT_GPG_PROGRAM};
use crate::services::DatabaseOptions;

/// Default number of backup generations kept on save
pub const DEFAULT_BACKUP_COUNT: usize = 5;

/// Default database file name, placed in the home directory
pub const DEFAULT_DATABASE_FILENAME: &str = "passwds.gpg";

const SETTINGS_FILENAME: &str = "settings.json";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    database_path: Option<PathBuf>,
    #[serde(default)]
    backup_count: Option<usize>,
    #[serde(default)]
    recipient: Option<String>,
    #[serde(default)]
    gpg_program: Option<PathBuf>,
    #[serde(default)]
    gpg_homedir: Option<PathBuf>,
}

/// pwstore configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub database_path: Option<PathBuf>,
    pub backup_count: Option<usize>,
    pub recipient: Option<String>,
    pub gpg_program: Option<PathBuf>,
    pub gpg_homedir: Option<PathBuf>,
}

impl Config {
    /// Load config from the store directory, applying environment overrides
    ///
    /// Recognised variables: `PWSTORE_DB`, `PWSTORE_BACKUPS`,
    /// `PWSTORE_RECIPIENT`, `PWSTORE_GPG`.
    pub fn load(store_dir: &Path) -> Result<Self> {
        Self::load_with_env(store_dir, |key| std::env::var(key).ok())
    }

    /// Load config using `env` to look up overrides
    pub fn load_with_env(store_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let settings_path = store_dir.join(SETTINGS_FILENAME);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid settings file {}", settings_path.display()))?
        } else {
            SettingsFile::default()
        };

        let backup_count = match env("PWSTORE_BACKUPS") {
            Some(value) => Some(
                value
                    .trim()
                    .parse::<usize>()
                    .with_context(|| format!("PWSTORE_BACKUPS must be a number, got {:?}", value))?,
            ),
            None => raw.backup_count,
        };

        Ok(Self {
            database_path: env("PWSTORE_DB").map(PathBuf::from).or(raw.database_path),
            backup_count,
            recipient: env("PWSTORE_RECIPIENT").or(raw.recipient),
            gpg_program: env("PWSTORE_GPG").map(PathBuf::from).or(raw.gpg_program),
            gpg_homedir: raw.gpg_homedir,
        })
    }

    /// Database path, defaulting to `~/passwds.gpg`
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(DEFAULT_DATABASE_FILENAME))
    }

    /// Number of backup generations to keep
    pub fn backup_count(&self) -> usize {
        self.backup_count.unwrap_or(DEFAULT_BACKUP_COUNT)
    }

    /// Options handed to [`crate::Database::open`]
    pub fn database_options(&self) -> DatabaseOptions {
        DatabaseOptions {
            backup_count: self.backup_count(),
            recipient: self.recipient.clone(),
        }
    }

    /// The GnuPG backend described by this config
    pub fn gpg_backend(&self) -> GpgBackend {
        let program = self
            .gpg_program
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_GPG_PROGRAM));
        let backend = GpgBackend::new(program);
        match &self.gpg_homedir {
            Some(homedir) => backend.with_homedir(homedir),
            None => backend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = tempdir().unwrap();
        let config = Config::load_with_env(dir.path(), no_env).unwrap();

        assert_eq!(config.backup_count(), DEFAULT_BACKUP_COUNT);
        assert!(config.recipient.is_none());
        assert_eq!(config.gpg_backend().program(), Path::new("gpg"));
    }

    #[test]
    fn test_settings_file_values() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILENAME),
            r#"{"databasePath": "/srv/pw.gpg", "backupCount": 2, "recipient": "me@example.com"}"#,
        )
        .unwrap();

        let config = Config::load_with_env(dir.path(), no_env).unwrap();
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/srv/pw.gpg"));

        let options = config.database_options();
        assert_eq!(options.backup_count, 2);
        assert_eq!(options.recipient.as_deref(), Some("me@example.com"));
    }

    #[test]
    fn test_env_overrides_settings() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILENAME),
            r#"{"backupCount": 2, "recipient": "file@example.com"}"#,
        )
        .unwrap();

        let config = Config::load_with_env(dir.path(), |key| match key {
            "PWSTORE_BACKUPS" => Some("0".to_string()),
            "PWSTORE_RECIPIENT" => Some("env@example.com".to_string()),
            "PWSTORE_GPG" => Some("/opt/gpg2".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.backup_count(), 0);
        assert_eq!(config.recipient.as_deref(), Some("env@example.com"));
        assert_eq!(config.gpg_backend().program(), Path::new("/opt/gpg2"));
    }

    #[test]
    fn test_invalid_backup_env_is_rejected() {
        let dir = tempdir().unwrap();
        let result = Config::load_with_env(dir.path(), |key| {
            (key == "PWSTORE_BACKUPS").then(|| "lots".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_settings_are_ignored() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILENAME),
            r#"{"editor": "vim", "gpgHomedir": "/tmp/gnupg"}"#,
        )
        .unwrap();

        let config = Config::load_with_env(dir.path(), no_env).unwrap();
        assert_eq!(config.gpg_homedir, Some(PathBuf::from("/tmp/gnupg")));
        assert_eq!(config.backup_count(), DEFAULT_BACKUP_COUNT);
    }
}
