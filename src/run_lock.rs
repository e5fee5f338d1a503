//! Single-run lock file.
//!
//! The lock holds the owning PID. A lock left behind by a process that is no
//! longer alive is reclaimed; a live holder makes acquisition fail at once.
//! An empty lock is a run that died between creating the file and writing its
//! PID, and is reclaimed once it is older than a short grace period.
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// How long an empty lock file may belong to a run that is still starting.
const EMPTY_LOCK_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock {path} is held by pid {pid}")]
    HeldBy { path: String, pid: i32 },

    #[error("lock {path} exists but cannot be read: {reason}; remove it if no run is active")]
    Unreadable { path: String, reason: String },

    #[error("cannot create lock {path}: {reason}")]
    Io { path: String, reason: String },
}

/// Removes the lock file when dropped.
#[derive(Debug)]
pub struct RunLockGuard {
    path: PathBuf,
}

impl RunLockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLockGuard {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to release run lock");
        }
    }
}

enum Holder {
    Alive(i32),
    Stale,
    Unknown(String),
}

/// Take the lock at `path`, reclaiming it once if its holder is gone.
pub fn acquire(path: &Path) -> Result<RunLockGuard, LockError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| LockError::Io {
                path: path.display().to_string(),
                reason: err.to_string(),
            })?;
        }
    }
    for _ in 0..2 {
        match try_create(path) {
            Ok(guard) => return Ok(guard),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => match holder(path) {
                Holder::Alive(pid) => {
                    return Err(LockError::HeldBy {
                        path: path.display().to_string(),
                        pid,
                    })
                }
                Holder::Stale => {
                    tracing::warn!(path = %path.display(), "reclaiming stale run lock");
                    let _ = fs::remove_file(path);
                }
                Holder::Unknown(reason) => {
                    return Err(LockError::Unreadable {
                        path: path.display().to_string(),
                        reason,
                    })
                }
            },
            Err(err) => {
                return Err(LockError::Io {
                    path: path.display().to_string(),
                    reason: err.to_string(),
                })
            }
        }
    }
    Err(LockError::Io {
        path: path.display().to_string(),
        reason: "lock reappeared while reclaiming it".to_string(),
    })
}

fn try_create(path: &Path) -> std::io::Result<RunLockGuard> {
    let mut file = OpenOptions::new().create_new(true).write(true).open(path)?;
    let guard = RunLockGuard {
        path: path.to_path_buf(),
    };
    writeln!(file, "{}", std::process::id())?;
    Ok(guard)
}

fn holder(path: &Path) -> Holder {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => return Holder::Unknown(err.to_string()),
    };
    if text.trim().is_empty() {
        return empty_holder(path);
    }
    match text.trim().parse::<i32>() {
        Ok(pid) if pid > 0 && is_process_running(pid) => Holder::Alive(pid),
        Ok(pid) if pid > 0 => Holder::Stale,
        _ => Holder::Unknown(format!("unexpected contents {:?}", text.trim())),
    }
}

fn empty_holder(path: &Path) -> Holder {
    let age = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map(|modified| SystemTime::now().duration_since(modified).unwrap_or_default());
    match age {
        Ok(age) if age > EMPTY_LOCK_GRACE => Holder::Stale,
        Ok(_) => Holder::Unknown("lock is empty; a run may still be starting".to_string()),
        Err(err) => Holder::Unknown(err.to_string()),
    }
}

#[cfg(unix)]
fn is_process_running(pid: i32) -> bool {
    // Signal 0 only checks that the pid exists and may be signalled.
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn is_process_running(_pid: i32) -> bool {
    true
}
