// src/guard/mod.rs

//! Singleton Guard: the PID marker proving at most one supervisor per UID.
//!
//! The marker holds the supervisor's pid as a bare decimal number. A missing
//! marker and a marker naming a dead process both mean "not running".

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::{debug, warn};

use crate::errors::Result;

/// What happened to the supervisor named by the marker during a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// SIGTERM was delivered.
    Signalled,
    /// No supervisor was resolved, or it had already exited.
    AlreadyGone,
    /// The signal could not be delivered. The marker is removed regardless.
    SignalFailed(Errno),
}

#[derive(Debug)]
pub struct SingletonGuard {
    pid_file: PathBuf,
    /// Last pid returned by [`SingletonGuard::resolve_running_pid`].
    resolved: Option<Pid>,
}

impl SingletonGuard {
    pub fn new(pid_file: impl Into<PathBuf>) -> Self {
        Self {
            pid_file: pid_file.into(),
            resolved: None,
        }
    }

    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    /// Read the marker and probe the pid it names.
    ///
    /// Returns `None` when the marker is absent, unparsable or stale. Never
    /// modifies the marker.
    pub fn resolve_running_pid(&mut self) -> Result<Option<Pid>> {
        self.resolved = match self.read_marker()? {
            Some(pid) if is_alive(pid) => Some(pid),
            Some(pid) => {
                debug!(pid = pid.as_raw(), "pid marker is stale");
                None
            }
            None => None,
        };
        Ok(self.resolved)
    }

    /// Write `pid` to the marker, replacing whatever was there.
    pub fn claim(&self, pid: Pid) -> Result<()> {
        fs::write(&self.pid_file, pid.as_raw().to_string())?;
        debug!(pid = pid.as_raw(), file = ?self.pid_file, "claimed pid marker");
        Ok(())
    }

    /// Delete the marker, then ask the resolved supervisor to terminate.
    ///
    /// A marker that is already gone and a process that already exited are
    /// both fine. Once the marker is deleted this never fails; a signal that
    /// cannot be delivered is logged and reported as
    /// [`Release::SignalFailed`].
    pub fn release(&mut self) -> Result<Release> {
        remove_marker(&self.pid_file)?;

        Ok(match self.resolved.take() {
            Some(pid) => signal_outcome(pid, kill(pid, Signal::SIGTERM)),
            None => Release::AlreadyGone,
        })
    }

    /// Remove a marker whose pid is dead. Returns whether one was removed.
    pub fn clear_stale(&mut self) -> Result<bool> {
        match self.read_marker()? {
            Some(pid) if !is_alive(pid) => {
                warn!(pid = pid.as_raw(), "removing stale pid marker");
                remove_marker(&self.pid_file)?;
                Ok(true)
            }
            None if self.pid_file.exists() => {
                warn!(file = ?self.pid_file, "removing unreadable pid marker");
                remove_marker(&self.pid_file)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Remove the marker only if it still names `pid`.
    ///
    /// A foreground supervisor uses this on exit so it never deletes a
    /// marker some later instance has claimed.
    pub fn release_if_owned(&self, pid: Pid) -> Result<bool> {
        if self.read_marker()? == Some(pid) {
            remove_marker(&self.pid_file)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn read_marker(&self) -> Result<Option<Pid>> {
        match fs::read_to_string(&self.pid_file) {
            Ok(contents) => Ok(parse_pid(&contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Parse marker contents. Non-positive values would make `kill` address a
/// process group, so they are rejected.
pub fn parse_pid(contents: &str) -> Option<Pid> {
    contents
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|raw| *raw > 0)
        .map(Pid::from_raw)
}

/// Zero-signal existence probe. `EPERM` means the process exists but belongs
/// to someone else.
pub fn is_alive(pid: Pid) -> bool {
    matches!(kill(pid, None), Ok(()) | Err(Errno::EPERM))
}

fn signal_outcome(pid: Pid, sent: nix::Result<()>) -> Release {
    match sent {
        Ok(()) => {
            debug!(pid = pid.as_raw(), "sent SIGTERM to supervisor");
            Release::Signalled
        }
        Err(Errno::ESRCH) => {
            debug!(pid = pid.as_raw(), "supervisor already gone");
            Release::AlreadyGone
        }
        Err(e) => {
            warn!(pid = pid.as_raw(), "could not signal supervisor: {e}");
            Release::SignalFailed(e)
        }
    }
}

fn remove_marker(path: &Path) -> Result<()> {
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
    fn parse_pid_rejects_group_addresses() {
        assert_eq!(parse_pid("1234\n"), Some(Pid::from_raw(1234)));
        assert_eq!(parse_pid("0"), None);
        assert_eq!(parse_pid("-1"), None);
        assert_eq!(parse_pid("abc"), None);
        assert_eq!(parse_pid(""), None);
    }

    #[test]
    fn undeliverable_signal_is_an_outcome_not_an_error() {
        let pid = Pid::from_raw(4242);
        assert_eq!(signal_outcome(pid, Ok(())), Release::Signalled);
        assert_eq!(signal_outcome(pid, Err(Errno::ESRCH)), Release::AlreadyGone);
        assert_eq!(
            signal_outcome(pid, Err(Errno::EPERM)),
            Release::SignalFailed(Errno::EPERM)
        );
    }

    #[test]
    fn own_process_is_alive() {
        assert!(is_alive(Pid::this()));
    }

    #[test]
    fn claim_writes_bare_decimal() {
        let dir = tempfile::tempdir().unwrap();
        let guard = SingletonGuard::new(dir.path().join("daemon.pid"));
        guard.claim(Pid::from_raw(4242)).unwrap();
        let contents = fs::read_to_string(guard.pid_file()).unwrap();
        assert_eq!(contents, "4242");
    }

    #[test]
    fn release_if_owned_leaves_foreign_markers() {
        let dir = tempfile::tempdir().unwrap();
        let guard = SingletonGuard::new(dir.path().join("daemon.pid"));
        guard.claim(Pid::from_raw(4242)).unwrap();

        assert!(!guard.release_if_owned(Pid::from_raw(1)).unwrap());
        assert!(guard.pid_file().exists());
        assert!(guard.release_if_owned(Pid::from_raw(4242)).unwrap());
        assert!(!guard.pid_file().exists());
    }
}
