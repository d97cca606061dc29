// src/config/paths.rs

//! Per-identity runtime file layout.
//!
//! All artifacts of one supervisor live next to each other, namespaced by
//! its UID, so several supervisors can share a runtime directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    pub dir: PathBuf,
    pub pid_file: PathBuf,
    pub log_file: PathBuf,
    pub error_log_file: PathBuf,
}

impl RuntimePaths {
    pub fn new(dir: impl Into<PathBuf>, uid: &str) -> Self {
        let dir = dir.into();
        Self {
            pid_file: dir.join(format!("{uid}.pid")),
            log_file: dir.join(format!("{uid}.log")),
            error_log_file: dir.join(format!("{uid}_error.log")),
            dir,
        }
    }

    /// Anchor relative paths at the current directory.
    ///
    /// The detached supervisor and its workers must agree on these paths no
    /// matter where they are started from.
    pub fn absolutize(self) -> Result<Self> {
        if self.dir.is_absolute() {
            return Ok(self);
        }
        let cwd = std::env::current_dir()?;
        Ok(Self {
            dir: cwd.join(&self.dir),
            pid_file: cwd.join(&self.pid_file),
            log_file: cwd.join(&self.log_file),
            error_log_file: cwd.join(&self.error_log_file),
        })
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Remove the log file; a missing file is fine.
    pub fn clear_log(&self) -> Result<()> {
        remove_if_exists(&self.log_file)
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_are_namespaced_by_uid() {
        let paths = RuntimePaths::new("/var/run/tickd", "mail");
        assert_eq!(paths.pid_file, PathBuf::from("/var/run/tickd/mail.pid"));
        assert_eq!(paths.log_file, PathBuf::from("/var/run/tickd/mail.log"));
        assert_eq!(
            paths.error_log_file,
            PathBuf::from("/var/run/tickd/mail_error.log")
        );
    }

    #[test]
    fn absolutize_keeps_absolute_paths() {
        let paths = RuntimePaths::new("/tmp/x", "daemon");
        assert_eq!(paths.clone().absolutize().unwrap(), paths);
    }

    #[test]
    fn relative_paths_become_absolute() {
        let paths = RuntimePaths::new("runtime", "daemon").absolutize().unwrap();
        assert!(paths.pid_file.is_absolute());
        assert!(paths.pid_file.ends_with("runtime/daemon.pid"));
    }

    #[test]
    fn clear_log_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RuntimePaths::new(dir.path(), "daemon");
        paths.clear_log().unwrap();
        fs::write(&paths.log_file, "old").unwrap();
        paths.clear_log().unwrap();
        assert!(!paths.log_file.exists());
    }
}
