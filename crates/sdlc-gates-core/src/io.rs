use crate::error::{GateError, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tempfile::NamedTempFile;
use tracing::warn;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// Prevents partial writes from corrupting the ledger or level files.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read a file to a string, returning `None` when it does not exist.
pub fn read_if_exists(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// True if `path` is a directory containing at least one entry.
pub fn dir_has_entries(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Lock files
// ---------------------------------------------------------------------------

/// Exclusive lock held as a sidecar file created with `create_new`.
/// The file is removed when the guard drops.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Wait up to `wait` for the lock at `path`. A lock file older than
    /// `stale_after` is assumed abandoned and removed.
    pub fn acquire(path: &Path, wait: Duration, stale_after: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let started = Instant::now();
        loop {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut f) => {
                    let _ = writeln!(f, "{}", std::process::id());
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if lock_age(path).is_some_and(|age| age >= stale_after) {
                        warn!(path = %path.display(), "removing stale lock file");
                        let _ = std::fs::remove_file(path);
                        continue;
                    }
                    if started.elapsed() >= wait {
                        return Err(GateError::LedgerLocked {
                            path: path.to_path_buf(),
                        });
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn lock_age(path: &Path) -> Option<Duration> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    SystemTime::now().duration_since(modified).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_file_is_exclusive_until_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".sdlc/gate-status.json.lock");
        let held = LockFile::acquire(&path, Duration::from_secs(1), Duration::from_secs(60)).unwrap();
        assert!(path.exists());

        let err = LockFile::acquire(&path, Duration::from_millis(50), Duration::from_secs(60))
            .unwrap_err();
        assert!(matches!(err, GateError::LedgerLocked { .. }));

        drop(held);
        assert!(!path.exists());
        LockFile::acquire(&path, Duration::from_millis(50), Duration::from_secs(60)).unwrap();
    }

    #[test]
    fn stale_lock_is_broken() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.lock");
        std::fs::write(&path, "12345\n").unwrap();
        let an_hour_ago = SystemTime::now() - Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(an_hour_ago)
            .unwrap();
        let lock =
            LockFile::acquire(&path, Duration::from_millis(50), Duration::from_secs(60)).unwrap();
        assert_eq!(lock.path(), path.as_path());
    }

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/gate-status.json");
        atomic_write(&path, b"{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn read_if_exists_missing_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_if_exists(&dir.path().join("nope")).unwrap().is_none());
    }

    #[test]
    fn dir_has_entries_detects_empty_and_missing() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("docs");
        assert!(!dir_has_entries(&sub));
        std::fs::create_dir_all(&sub).unwrap();
        assert!(!dir_has_entries(&sub));
        std::fs::write(sub.join("x.md"), "x").unwrap();
        assert!(dir_has_entries(&sub));
    }
}
