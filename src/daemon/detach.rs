// src/daemon/detach.rs

//! Detaching the supervisor from the invoking terminal.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::fd::AsRawFd;

use nix::unistd::{ForkResult, Pid, dup2, fork, setsid};

use crate::config::RuntimePaths;
use crate::errors::Result;

/// Which side of the fork we are on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Parent(Pid),
    Child,
}

/// Fork the current process.
///
/// Must run before any thread or async runtime exists.
pub fn fork_supervisor() -> Result<Branch> {
    // SAFETY: the caller is single-threaded at this point; the child goes on
    // to build its own runtime from scratch.
    match unsafe { fork() }? {
        ForkResult::Parent { child } => Ok(Branch::Parent(child)),
        ForkResult::Child => Ok(Branch::Child),
    }
}

/// Leave the parent's session so the terminal closing does not hang us up.
pub fn become_session_leader() -> Result<()> {
    setsid()?;
    Ok(())
}

/// stdin from `/dev/null`, stdout to the log file, stderr to the error log.
pub fn redirect_stdio(paths: &RuntimePaths) -> Result<()> {
    std::io::stdout().flush()?;
    std::io::stderr().flush()?;

    let null = File::open("/dev/null")?;
    let out = append(paths.log_file.as_path())?;
    let err = append(paths.error_log_file.as_path())?;

    dup2(null.as_raw_fd(), libc::STDIN_FILENO)?;
    dup2(out.as_raw_fd(), libc::STDOUT_FILENO)?;
    dup2(err.as_raw_fd(), libc::STDERR_FILENO)?;
    Ok(())
}

fn append(path: &std::path::Path) -> Result<File> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}
