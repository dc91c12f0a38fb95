//! Backup rotation
//!
//! Backups live next to the database and share its name with a numeric
//! suffix: `passwds.gpg`, `passwds.gpg.0`, `passwds.gpg.1`, ... Generation 0
//! is the most recent backup.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::domain::result::{Error, Result};
use crate::domain::BackupMetadata;

/// Path of backup generation `index` for `target`
pub fn backup_path(target: &Path, index: usize) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

fn file_name(target: &Path) -> Result<String> {
    target
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::config(format!("Invalid database path: {}", target.display())))
}

fn parent_dir(target: &Path) -> &Path {
    match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Existing numbered backups of `target`, ordered by suffix ascending
fn numbered_backups(target: &Path) -> Result<Vec<(u32, PathBuf)>> {
    let base = file_name(target)?;
    let prefix = format!("{}.", base);
    let dir = parent_dir(target);

    let mut backups = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some(suffix) = name.strip_prefix(&prefix) else {
            continue;
        };
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if let Ok(generation) = suffix.parse::<u32>() {
            backups.push((generation, entry.path()));
        }
    }

    backups.sort_by_key(|(generation, _)| *generation);
    Ok(backups)
}

/// The live file (if present, generation `None`) followed by its backups,
/// in rotation order
fn generations(target: &Path) -> Result<Vec<(Option<u32>, PathBuf)>> {
    let mut files = Vec::new();
    if target.exists() {
        files.push((None, target.to_path_buf()));
    }
    files.extend(
        numbered_backups(target)?
            .into_iter()
            .map(|(generation, path)| (Some(generation), path)),
    );
    Ok(files)
}

/// The live file (if present) followed by its backups, in rotation order
///
/// A file's position in this list is its index for rotation purposes.
pub fn rotation_candidates(target: &Path) -> Result<Vec<PathBuf>> {
    Ok(generations(target)?.into_iter().map(|(_, path)| path).collect())
}

/// What happened to one file during rotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationStep {
    Renamed { from: PathBuf, to: PathBuf },
    Removed(PathBuf),
}

/// Shift the live file and its backups up one generation
///
/// The file at position `i` of [`rotation_candidates`] becomes backup `i`,
/// which closes any gaps in the numbering. Files at position `retention`
/// and above are deleted first. Files moving to a higher number sit at the
/// front of the list and are moved last-first; files moving down to fill a
/// gap sit behind them and are moved first-first. Either way a destination
/// has been vacated before anything is renamed onto it. Afterwards `target`
/// itself no longer exists.
pub fn rotate(target: &Path, retention: usize) -> Result<Vec<RotationStep>> {
    let mut files = generations(target)?;
    let mut steps = Vec::with_capacity(files.len());

    let expired = files.split_off(files.len().min(retention));
    for (_, path) in expired.into_iter().rev() {
        fs::remove_file(&path)?;
        steps.push(RotationStep::Removed(path));
    }

    let (up, down): (Vec<_>, Vec<_>) = files
        .into_iter()
        .enumerate()
        .filter(|(index, (generation, _))| *generation != Some(*index as u32))
        .partition(|(index, (generation, _))| generation.map_or(true, |g| (g as usize) < *index));

    let moves = up.into_iter().rev().chain(down);
    for (index, (_, path)) in moves {
        let destination = backup_path(target, index);
        fs::rename(&path, &destination)?;
        steps.push(RotationStep::Renamed {
            from: path,
            to: destination,
        });
    }

    Ok(steps)
}

/// Describe the existing backups of `target`, newest generation first
pub fn list_backups(target: &Path) -> Result<Vec<BackupMetadata>> {
    let mut backups = Vec::new();
    for (generation, path) in numbered_backups(target)? {
        let metadata = fs::metadata(&path)?;
        let modified_at: DateTime<Utc> = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        backups.push(BackupMetadata::new(
            name,
            generation,
            modified_at,
            metadata.len(),
        ));
    }
    Ok(backups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        fs::write(path, content).unwrap();
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_backup_path_appends_suffix() {
        let target = Path::new("/home/me/passwds.gpg");
        assert_eq!(backup_path(target, 3), PathBuf::from("/home/me/passwds.gpg.3"));
    }

    #[test]
    fn test_candidates_order_numerically() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("db");
        write(&target, "live");
        for n in [10, 2, 0] {
            write(&backup_path(&target, n), "old");
        }
        // Not backups
        write(&dir.path().join("db.lock"), "");
        write(&dir.path().join("db+"), "");
        write(&dir.path().join("db.1x"), "");
        write(&dir.path().join("other.1"), "");

        let files = rotation_candidates(&target).unwrap();
        assert_eq!(
            files,
            vec![
                target.clone(),
                backup_path(&target, 0),
                backup_path(&target, 2),
                backup_path(&target, 10),
            ]
        );
    }

    #[test]
    fn test_rotate_retention_two() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("db");
        write(&target, "gen-live");
        write(&backup_path(&target, 0), "gen-0");
        write(&backup_path(&target, 2), "gen-2");

        rotate(&target, 2).unwrap();

        assert!(!target.exists());
        assert_eq!(read(&backup_path(&target, 0)), "gen-live");
        assert_eq!(read(&backup_path(&target, 1)), "gen-0");
        assert!(!backup_path(&target, 2).exists());
    }

    #[test]
    fn test_rotate_keeps_at_most_retention_backups() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("db");
        write(&target, "live");
        for n in 0..5 {
            write(&backup_path(&target, n), &format!("gen-{}", n));
        }

        let steps = rotate(&target, 3).unwrap();

        let removed = steps
            .iter()
            .filter(|s| matches!(s, RotationStep::Removed(_)))
            .count();
        assert_eq!(removed, 3);
        assert_eq!(read(&backup_path(&target, 0)), "live");
        assert_eq!(read(&backup_path(&target, 1)), "gen-0");
        assert_eq!(read(&backup_path(&target, 2)), "gen-1");
        assert!(!backup_path(&target, 3).exists());
        assert!(!backup_path(&target, 4).exists());
    }

    #[test]
    fn test_rotate_closes_gaps() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("db");
        write(&target, "live");
        write(&backup_path(&target, 3), "gen-3");

        rotate(&target, 5).unwrap();

        assert_eq!(read(&backup_path(&target, 0)), "live");
        assert_eq!(read(&backup_path(&target, 1)), "gen-3");
        assert!(!backup_path(&target, 3).exists());
    }

    #[test]
    fn test_rotate_closes_several_gaps_without_losing_backups() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("db");
        write(&target, "live");
        for n in [3, 4, 5] {
            write(&backup_path(&target, n), &format!("gen-{}", n));
        }

        rotate(&target, 5).unwrap();

        assert!(!target.exists());
        assert_eq!(read(&backup_path(&target, 0)), "live");
        assert_eq!(read(&backup_path(&target, 1)), "gen-3");
        assert_eq!(read(&backup_path(&target, 2)), "gen-4");
        assert_eq!(read(&backup_path(&target, 3)), "gen-5");
        assert!(!backup_path(&target, 4).exists());
        assert!(!backup_path(&target, 5).exists());
    }

    #[test]
    fn test_rotate_shifts_up_and_closes_gaps_together() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("db");
        write(&target, "live");
        for n in [0, 1, 4, 9, 12] {
            write(&backup_path(&target, n), &format!("gen-{}", n));
        }

        rotate(&target, 5).unwrap();

        let expected = ["live", "gen-0", "gen-1", "gen-4", "gen-9"];
        for (n, content) in expected.iter().enumerate() {
            assert_eq!(read(&backup_path(&target, n)), *content);
        }
        assert!(!backup_path(&target, 9).exists());
        assert!(!backup_path(&target, 12).exists());
        assert_eq!(rotation_candidates(&target).unwrap().len(), 5);
    }

    #[test]
    fn test_rotate_gaps_without_live_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("db");
        write(&backup_path(&target, 2), "gen-2");
        write(&backup_path(&target, 5), "gen-5");
        write(&backup_path(&target, 6), "gen-6");

        rotate(&target, 5).unwrap();

        assert_eq!(read(&backup_path(&target, 0)), "gen-2");
        assert_eq!(read(&backup_path(&target, 1)), "gen-5");
        assert_eq!(read(&backup_path(&target, 2)), "gen-6");
        assert!(!backup_path(&target, 5).exists());
        assert!(!backup_path(&target, 6).exists());
    }

    #[test]
    fn test_rotate_without_live_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("db");
        write(&backup_path(&target, 0), "gen-0");

        let steps = rotate(&target, 2).unwrap();

        assert!(steps.is_empty());
        assert_eq!(read(&backup_path(&target, 0)), "gen-0");
    }

    #[test]
    fn test_list_backups() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("db");
        write(&target, "live");
        write(&backup_path(&target, 1), "one!");
        write(&backup_path(&target, 0), "zero");

        let backups = list_backups(&target).unwrap();
        let names: Vec<_> = backups.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["db.0", "db.1"]);
        assert_eq!(backups[1].generation, 1);
        assert_eq!(backups[1].size_bytes, 4);
    }
}
