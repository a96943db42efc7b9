//! Per-guild cycle lock shared across processes.
//!
//! The daemon and one-shot `econcal sync` runs take the same lock file
//! before writing to a guild, so two cycles never submit creates to the
//! same guild at once. The file holds the owner's PID; a file left behind
//! by a dead process is reclaimed.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};

/// Held for the duration of one cycle; the file is removed on drop.
#[derive(Debug)]
pub struct CycleLock {
    path: PathBuf,
}

impl CycleLock {
    /// Takes the lock at `path`.
    ///
    /// # Errors
    ///
    /// [`SyncError::AlreadyRunning`] if a live process holds it,
    /// [`SyncError::Lock`] if the file cannot be written.
    pub fn acquire(path: impl Into<PathBuf>) -> SyncResult<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| SyncError::lock(&path, e))?;
        }

        // Second pass only happens after reclaiming a stale file.
        for _ in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    writeln!(file, "{}", process::id()).map_err(|e| SyncError::lock(&path, e))?;
                    debug!(path = %path.display(), "Cycle lock acquired");
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    match read_holder(&path) {
                        Some(pid) if is_alive(pid) => {
                            debug!(path = %path.display(), pid, "Cycle lock held");
                            return Err(SyncError::AlreadyRunning);
                        }
                        holder => {
                            warn!(path = %path.display(), pid = ?holder, "Reclaiming stale cycle lock");
                            match fs::remove_file(&path) {
                                Ok(()) => {}
                                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                                Err(e) => return Err(SyncError::lock(&path, e)),
                            }
                        }
                    }
                }
                Err(e) => return Err(SyncError::lock(&path, e)),
            }
        }
        Err(SyncError::AlreadyRunning)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CycleLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Cycle lock released"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove cycle lock"),
        }
    }
}

/// Default lock file for a guild.
///
/// `$XDG_RUNTIME_DIR/econcal-<guild>.lock`, or the temp dir otherwise.
pub fn default_lock_path(guild_id: &str) -> PathBuf {
    let dir = std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    let guild: String = guild_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    dir.join(format!("econcal-{}.lock", guild))
}

fn read_holder(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(unix)]
fn is_alive(pid: u32) -> bool {
    if pid == process::id() {
        return true;
    }
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // Signal 0 checks existence only; EPERM means another user owns it.
    (unsafe { libc::kill(pid, 0) == 0 })
        || io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn is_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("guild.lock");

        {
            let lock = CycleLock::acquire(&path).unwrap();
            assert_eq!(lock.path(), path);
            let stored: u32 = fs::read_to_string(&path).unwrap().trim().parse().unwrap();
            assert_eq!(stored, process::id());
        }

        assert!(!path.exists());
    }

    #[test]
    fn second_holder_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("guild.lock");

        let _held = CycleLock::acquire(&path).unwrap();
        assert!(matches!(
            CycleLock::acquire(&path),
            Err(SyncError::AlreadyRunning)
        ));
    }

    #[test]
    fn dead_holder_is_reclaimed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("guild.lock");
        fs::write(&path, "999999999\n").unwrap();

        let lock = CycleLock::acquire(&path).unwrap();
        assert!(path.exists());
        drop(lock);
    }

    #[test]
    fn garbage_lock_file_is_reclaimed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("guild.lock");
        fs::write(&path, "not-a-pid\n").unwrap();

        assert!(CycleLock::acquire(&path).is_ok());
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run").join("guild.lock");

        let _lock = CycleLock::acquire(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn default_path_is_per_guild() {
        let path = default_lock_path("123456789012345678");
        assert!(path.to_string_lossy().ends_with("econcal-123456789012345678.lock"));
        assert_ne!(default_lock_path("1"), default_lock_path("2"));
    }
}
