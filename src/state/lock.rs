//! Per-niche exclusive lock
//!
//! A lock file created with create-new semantics. Whoever creates it owns
//! the niche until the guard is dropped. The file records the holder pid; a
//! lock left behind by a process that no longer runs (or by this process)
//! is reclaimed, so an interrupted batch can simply be restarted.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::StateError;

/// File name of the lock inside a niche directory
pub const LOCK_FILE_NAME: &str = ".nichecast.lock";

/// Guard holding the niche lock; removes the file on drop
#[derive(Debug)]
pub struct NicheLock {
    path: PathBuf,
}

impl NicheLock {
    /// Create the lock file, failing with [`StateError::Locked`] if a live
    /// process holds it
    ///
    /// A lock without a readable pid is treated as held: its owner may be
    /// between creating the file and writing the pid.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self, StateError> {
        let path = path.into();
        let mut file = match create(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let holder = read_holder(&path);
                match holder {
                    Some(pid) if is_stale(pid) => {
                        tracing::warn!(path = %path.display(), pid, "Reclaiming stale niche lock");
                        match fs::remove_file(&path) {
                            Ok(()) => {}
                            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                            Err(e) => return Err(StateError::io("remove stale lock", &path, e)),
                        }
                        // Someone else may win the race for the fresh lock
                        match create(&path) {
                            Ok(file) => file,
                            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                                return Err(StateError::Locked {
                                    holder: read_holder(&path),
                                    path,
                                });
                            }
                            Err(e) => return Err(StateError::io("create lock", &path, e)),
                        }
                    }
                    _ => return Err(StateError::Locked { path, holder }),
                }
            }
            Err(e) => return Err(StateError::io("create lock", &path, e)),
        };

        // Holder pid is informational only
        if let Err(e) = writeln!(file, "{}", std::process::id()) {
            tracing::debug!(path = %path.display(), error = %e, "Could not write lock holder");
        }

        tracing::debug!(path = %path.display(), "Niche lock acquired");
        Ok(Self { path })
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for NicheLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Niche lock released"),
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove niche lock"
            ),
        }
    }
}

fn create(path: &Path) -> io::Result<fs::File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

fn read_holder(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// A lock is stale when its holder is this process or no longer running
fn is_stale(pid: u32) -> bool {
    pid == std::process::id() || !process_alive(pid)
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(all(unix, not(target_os = "linux")))]
fn process_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(true)
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}
