//! Exclusive per-ledger run lock.
//!
//! The lock is a sibling file `{ledger}.lock` created with `create_new`, so only one
//! process can hold it. A lock older than `stale_after` is assumed abandoned by a
//! crashed run and reclaimed: it is first renamed to a unique name, so of several
//! runs reclaiming at once only the one whose rename succeeds deletes anything.

use crate::domain::error::PipelineError;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(15 * 60);

#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

pub fn lock_path(ledger: &Path) -> PathBuf {
    let mut name = ledger.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

fn try_create(path: &Path) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(())
}

fn grave_path(lock: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    let mut name = lock.as_os_str().to_os_string();
    name.push(format!(".stale.{}.{}", std::process::id(), nanos));
    PathBuf::from(name)
}

fn is_stale(path: &Path, stale_after: Duration) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age >= stale_after)
}

impl RunLock {
    /// Takes the lock for `ledger`, failing with `LedgerBusy` if another run holds it.
    pub fn acquire(ledger: &Path, stale_after: Duration) -> Result<Self, PipelineError> {
        let path = lock_path(ledger);
        let busy = || PipelineError::LedgerBusy {
            path: ledger.to_path_buf(),
        };
        let create = |path: &Path| {
            try_create(path).map_err(|e| {
                if e.kind() == ErrorKind::AlreadyExists {
                    busy()
                } else {
                    PipelineError::at(path)(e)
                }
            })
        };

        match create(&path) {
            Ok(()) => {}
            Err(PipelineError::LedgerBusy { .. }) => {
                if !is_stale(&path, stale_after) {
                    return Err(busy());
                }
                if !reclaim(&path, stale_after)? {
                    return Err(busy());
                }
                create(&path)?;
            }
            Err(e) => return Err(e),
        }
        debug!(lock = %path.display(), "acquired ledger lock");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Moves a stale lock out of the way. Returns false if the lock turned out to be
/// live by the time it was moved.
fn reclaim(path: &Path, stale_after: Duration) -> Result<bool, PipelineError> {
    let grave = grave_path(path);
    match fs::rename(path, &grave) {
        Ok(()) => {}
        // Another run reclaimed it first.
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(PipelineError::at(path)(e)),
    }

    if !is_stale(&grave, stale_after) {
        // A fresh lock was taken between the check and the rename; put it back.
        // If yet another run has created one meanwhile the link fails and the
        // moved lock is dropped, which leaves that newer lock in charge.
        let restored = fs::hard_link(&grave, path).is_ok();
        let _ = fs::remove_file(&grave);
        debug!(lock = %path.display(), restored, "lock was live, backing off");
        return Ok(false);
    }

    warn!(lock = %path.display(), "reclaiming stale ledger lock");
    fs::remove_file(&grave).map_err(PipelineError::at(&grave))?;
    Ok(true)
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), error = %e, "failed to release ledger lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_path_appends_suffix() {
        assert_eq!(
            lock_path(Path::new("/x/level1/AAPL_1y_1d.ledger")),
            PathBuf::from("/x/level1/AAPL_1y_1d.ledger.lock")
        );
    }

    #[test]
    fn second_acquire_is_busy_until_release() {
        let dir = TempDir::new().unwrap();
        let ledger = dir.path().join("T_1y_1d.ledger");

        let lock = RunLock::acquire(&ledger, DEFAULT_STALE_AFTER).unwrap();
        assert!(lock.path().exists());
        assert!(matches!(
            RunLock::acquire(&ledger, DEFAULT_STALE_AFTER),
            Err(PipelineError::LedgerBusy { .. })
        ));

        drop(lock);
        assert!(!lock_path(&ledger).exists());
        assert!(RunLock::acquire(&ledger, DEFAULT_STALE_AFTER).is_ok());
    }

    #[test]
    fn stale_lock_is_reclaimed() {
        let dir = TempDir::new().unwrap();
        let ledger = dir.path().join("T_1y_1d.ledger");
        fs::write(lock_path(&ledger), "12345\n").unwrap();

        let lock = RunLock::acquire(&ledger, Duration::ZERO).unwrap();
        let owner = fs::read_to_string(lock.path()).unwrap();
        assert_eq!(owner.trim(), std::process::id().to_string());
    }

    #[test]
    fn reclaim_leaves_no_stale_files_behind() {
        let dir = TempDir::new().unwrap();
        let ledger = dir.path().join("T_1y_1d.ledger");
        fs::write(lock_path(&ledger), "12345\n").unwrap();

        let lock = RunLock::acquire(&ledger, Duration::ZERO).unwrap();
        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["T_1y_1d.ledger.lock".to_string()]);
        drop(lock);
    }

    #[test]
    fn live_lock_moved_by_reclaim_is_restored() {
        let dir = TempDir::new().unwrap();
        let ledger = dir.path().join("T_1y_1d.ledger");
        let held = RunLock::acquire(&ledger, DEFAULT_STALE_AFTER).unwrap();

        assert!(!reclaim(held.path(), DEFAULT_STALE_AFTER).unwrap());
        assert!(held.path().exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
        assert!(matches!(
            RunLock::acquire(&ledger, DEFAULT_STALE_AFTER),
            Err(PipelineError::LedgerBusy { .. })
        ));
    }

    #[test]
    fn reclaim_after_another_run_won_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let lock = dir.path().join("T_1y_1d.ledger.lock");
        assert!(reclaim(&lock, Duration::ZERO).unwrap());
    }

    #[test]
    fn missing_directory_names_the_lock() {
        let dir = TempDir::new().unwrap();
        let ledger = dir.path().join("nope").join("T_1y_1d.ledger");
        let err = RunLock::acquire(&ledger, DEFAULT_STALE_AFTER).unwrap_err();
        assert!(matches!(err, PipelineError::Storage { .. }));
        assert!(err.to_string().contains("T_1y_1d.ledger.lock"));
    }
}
