//! Single-instance pidfile lock
//!
//! The file holds the owner's pid. A leftover file whose pid is dead, or
//! belongs to some other program, is taken over.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{BattlogError, Result};

/// Held lock; the file is removed on drop
#[derive(Debug)]
pub struct PidLock {
    path: PathBuf,
}

impl PidLock {
    /// Take the lock for `process_name`.
    ///
    /// `Ok(None)` when a live `process_name` process already owns it.
    pub fn acquire(path: impl Into<PathBuf>, process_name: &str) -> Result<Option<Self>> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| BattlogError::io(dir, e))?;
        }

        if Self::try_create(&path)? {
            return Ok(Some(Self { path }));
        }

        let content = fs::read_to_string(&path).map_err(|e| BattlogError::io(&path, e))?;
        if let Ok(pid) = content.trim().parse::<u32>() {
            if pid != std::process::id() && is_running_as(pid, process_name) {
                debug!("Lock {} held by pid {}", path.display(), pid);
                return Ok(None);
            }
        }

        warn!("Removing stale lock {}", path.display());
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(BattlogError::io(&path, e)),
        }

        if Self::try_create(&path)? {
            Ok(Some(Self { path }))
        } else {
            // lost the race to another starter
            Ok(None)
        }
    }

    /// `Ok(false)` when the file already exists
    fn try_create(path: &Path) -> Result<bool> {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                write!(file, "{}", std::process::id()).map_err(|e| BattlogError::io(path, e))?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(BattlogError::io(path, e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pid recorded in an existing lock file
    pub fn holder(path: &Path) -> Option<u32> {
        fs::read_to_string(path).ok()?.trim().parse().ok()
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to remove lock {}: {}", self.path.display(), e);
        }
    }
}

/// Whether `pid` is alive and looks like `process_name`. The kernel truncates
/// `comm` to 15 bytes, so the command line is checked as well.
pub fn is_running_as(pid: u32, process_name: &str) -> bool {
    let proc_dir = PathBuf::from(format!("/proc/{}", pid));
    if !proc_dir.exists() {
        return false;
    }

    if let Ok(comm) = fs::read_to_string(proc_dir.join("comm")) {
        if comm.trim() == process_name {
            return true;
        }
    }

    fs::read(proc_dir.join("cmdline"))
        .map(|raw| cmdline_names(&raw, process_name))
        .unwrap_or(false)
}

/// Whether the basename of argv[0] in a raw `cmdline` equals `process_name`
fn cmdline_names(raw: &[u8], process_name: &str) -> bool {
    let argv0 = raw.split(|&b| b == 0).next().unwrap_or_default();
    let argv0 = String::from_utf8_lossy(argv0);
    argv0.rsplit('/').next() == Some(process_name)
}
