//! Database service - the encrypted credential file
//!
//! Owns the in-memory record set for one database file and drives the
//! decrypt-on-load / encrypt-on-save cycle. A save writes the new ciphertext
//! to a staging file first, rotates backups, and only then renames the
//! staging file over the database, so a failed encryption never touches the
//! existing file or its backups.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use zeroize::Zeroizing;

use crate::config::DEFAULT_BACKUP_COUNT;
use crate::domain::result::{Error, Result};
use crate::domain::{parse_plaintext, render_plaintext, Record};
use crate::ports::{CryptoBackend, Secret};

use super::rotation::{self, RotationStep};

/// Suffix marking the staging file next to the database
pub const STAGING_SUFFIX: &str = "+";

/// Suffix of the advisory lock file next to the database
pub const LOCK_SUFFIX: &str = ".lock";

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Staging path used while saving `path`
pub fn staging_path(path: &Path) -> PathBuf {
    with_suffix(path, STAGING_SUFFIX)
}

/// Settings a database needs beyond its path and secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseOptions {
    /// Backup generations kept on save; 0 keeps none
    pub backup_count: usize,
    /// Identity the database is encrypted to. Only required for saving.
    pub recipient: Option<String>,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            backup_count: DEFAULT_BACKUP_COUNT,
            recipient: None,
        }
    }
}

/// Result of [`Database::set`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// No record matched; a new one was appended
    Added,
    /// Exactly one record matched and its password was replaced
    Updated,
}

/// Summary of a completed save
#[derive(Debug, Clone)]
pub struct SaveReport {
    pub records: usize,
    pub rotation: Vec<RotationStep>,
}

/// One encrypted credential database
///
/// Holds an exclusive advisory lock on `<path>.lock` for as long as it
/// lives, so a second process cannot race the staging and rotation steps.
pub struct Database {
    path: PathBuf,
    secret: Secret,
    options: DatabaseOptions,
    backend: Arc<dyn CryptoBackend>,
    records: Vec<Record>,
    loaded: bool,
    _lock: File,
}

impl Database {
    /// Open the database at `path` without reading it yet
    ///
    /// The path is made absolute. Fails with [`Error::Locked`] when another
    /// process already has the database open.
    pub fn open(
        path: impl AsRef<Path>,
        secret: Secret,
        options: DatabaseOptions,
        backend: Arc<dyn CryptoBackend>,
    ) -> Result<Self> {
        let path = std::path::absolute(path.as_ref())?;

        let lock_path = with_suffix(&path, LOCK_SUFFIX);
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        lock.try_lock_exclusive()
            .map_err(|_| Error::Locked(path.clone()))?;

        Ok(Self {
            path,
            secret,
            options,
            backend,
            records: Vec::new(),
            loaded: false,
            _lock: lock,
        })
    }

    /// Read and decrypt the database
    ///
    /// A missing file is a new, empty database. On any failure the
    /// previously held records are kept and nothing on disk changes.
    pub fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            self.records.clear();
            self.loaded = true;
            return Ok(());
        }

        let bytes = self.backend.decrypt(&self.path, &self.secret)?;
        let plaintext = Zeroizing::new(String::from_utf8(bytes).map_err(|_| {
            Error::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                "decrypted database is not valid UTF-8",
            ))
        })?);

        self.records = parse_plaintext(&plaintext)?;
        self.loaded = true;
        Ok(())
    }

    /// Encrypt the records and replace the database file
    ///
    /// Steps: encrypt into the staging file, rotate (or drop) the current
    /// file, then rename the staging file into place.
    pub fn save(&mut self) -> Result<SaveReport> {
        if !self.loaded {
            return Err(Error::NotLoaded);
        }
        let recipient = self
            .options
            .recipient
            .as_deref()
            .ok_or_else(|| Error::config("no recipient identity configured for encryption"))?;

        let staging = staging_path(&self.path);
        if staging.exists() {
            fs::remove_file(&staging)?;
        }

        let plaintext = Zeroizing::new(render_plaintext(&self.records));
        if let Err(e) = self.backend.encrypt(plaintext.as_bytes(), recipient, &staging) {
            // Partial output is useless and must not be promoted later
            if staging.exists() {
                let _ = fs::remove_file(&staging);
            }
            return Err(e);
        }
        if !staging.exists() {
            return Err(Error::StagingFileMissing(staging));
        }

        let rotation = if self.options.backup_count > 0 {
            rotation::rotate(&self.path, self.options.backup_count)?
        } else {
            if self.path.exists() {
                fs::remove_file(&self.path)?;
            }
            Vec::new()
        };

        fs::rename(&staging, &self.path)?;

        Ok(SaveReport {
            records: self.records.len(),
            rotation,
        })
    }

    /// Records matching `account` and, optionally, `username`
    pub fn find(&self, account: &str, username: Option<&str>) -> Vec<&Record> {
        self.records
            .iter()
            .filter(|r| r.matches(account, username))
            .collect()
    }

    /// Set the password of the single record matching the filter, or add a
    /// new record when nothing matches
    ///
    /// More than one match is [`Error::AmbiguousMatch`] and leaves the
    /// records untouched.
    pub fn set(
        &mut self,
        account: &str,
        username: Option<&str>,
        password: impl Into<String>,
    ) -> Result<SetOutcome> {
        if !self.loaded {
            return Err(Error::NotLoaded);
        }

        let matching: Vec<usize> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.matches(account, username))
            .map(|(i, _)| i)
            .collect();

        match matching.as_slice() {
            [] => {
                self.records
                    .push(Record::new(account, username.unwrap_or(""), password));
                Ok(SetOutcome::Added)
            }
            [index] => {
                self.records[*index].password = password.into();
                Ok(SetOutcome::Updated)
            }
            many => Err(Error::AmbiguousMatch { count: many.len() }),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Backend that must never be reached
    struct UnusedBackend;

    impl CryptoBackend for UnusedBackend {
        fn encrypt(&self, _: &[u8], _: &str, _: &Path) -> Result<()> {
            panic!("encrypt should not be called");
        }

        fn decrypt(&self, _: &Path, _: &Secret) -> Result<Vec<u8>> {
            panic!("decrypt should not be called");
        }
    }

    fn open_empty(dir: &Path) -> Database {
        let mut db = Database::open(
            dir.join("passwds.gpg"),
            Secret::new("pw"),
            DatabaseOptions::default(),
            Arc::new(UnusedBackend),
        )
        .unwrap();
        db.load().unwrap();
        db
    }

    #[test]
    fn test_staging_path() {
        assert_eq!(
            staging_path(Path::new("/home/me/passwds.gpg")),
            PathBuf::from("/home/me/passwds.gpg+")
        );
    }

    #[test]
    fn test_open_path_is_absolute() {
        let dir = tempdir().unwrap();
        let db = open_empty(dir.path());
        assert!(db.path().is_absolute());
    }

    #[test]
    fn test_missing_file_loads_empty_without_backend() {
        let dir = tempdir().unwrap();
        let db = open_empty(dir.path());
        assert!(db.is_loaded());
        assert!(db.records().is_empty());
    }

    #[test]
    fn test_save_before_load_is_refused() {
        let dir = tempdir().unwrap();
        let mut db = Database::open(
            dir.path().join("passwds.gpg"),
            Secret::new("pw"),
            DatabaseOptions::default(),
            Arc::new(UnusedBackend),
        )
        .unwrap();

        assert!(matches!(db.save(), Err(Error::NotLoaded)));
        assert!(matches!(db.set("a", None, "b"), Err(Error::NotLoaded)));
    }

    #[test]
    fn test_save_without_recipient_touches_nothing() {
        let dir = tempdir().unwrap();
        let mut db = open_empty(dir.path());
        db.set("mail", None, "pw").unwrap();

        assert!(matches!(db.save(), Err(Error::Config(_))));
        assert!(!db.path().exists());
        assert!(!staging_path(db.path()).exists());
    }

    #[test]
    fn test_set_adds_then_updates() {
        let dir = tempdir().unwrap();
        let mut db = open_empty(dir.path());

        assert_eq!(db.set("example.com", Some("alice"), "one").unwrap(), SetOutcome::Added);
        assert_eq!(db.set("EXAMPLE", Some("ALI"), "two").unwrap(), SetOutcome::Updated);

        assert_eq!(db.records(), &[Record::new("example.com", "alice", "two")]);
    }

    #[test]
    fn test_set_without_username_adds_empty_username() {
        let dir = tempdir().unwrap();
        let mut db = open_empty(dir.path());

        db.set("wifi", None, "hunter2").unwrap();
        assert_eq!(db.records()[0].username, "");
    }

    #[test]
    fn test_set_ambiguous_leaves_records_unchanged() {
        let dir = tempdir().unwrap();
        let mut db = open_empty(dir.path());
        db.set("example.com", Some("alice"), "a").unwrap();
        db.set("example.com", Some("bob"), "b").unwrap();

        let err = db.set("example", None, "new").unwrap_err();
        assert!(matches!(err, Error::AmbiguousMatch { count: 2 }));
        assert_eq!(db.records()[0].password, "a");
        assert_eq!(db.records()[1].password, "b");
    }

    #[test]
    fn test_find_filters() {
        let dir = tempdir().unwrap();
        let mut db = open_empty(dir.path());
        db.set("example.com", Some("alice"), "a").unwrap();
        db.set("example.com", Some("bob"), "b").unwrap();
        db.set("bank", Some("alice"), "c").unwrap();

        assert_eq!(db.find("example", None).len(), 2);
        assert_eq!(db.find("example", Some("BOB")).len(), 1);
        assert_eq!(db.find("", Some("alice")).len(), 2);
        assert!(db.find("nothing", None).is_empty());
    }

    #[test]
    fn test_second_open_is_locked() {
        let dir = tempdir().unwrap();
        let _first = open_empty(dir.path());

        let second = Database::open(
            dir.path().join("passwds.gpg"),
            Secret::new("pw"),
            DatabaseOptions::default(),
            Arc::new(UnusedBackend),
        );
        assert!(matches!(second, Err(Error::Locked(_))));
    }
}
