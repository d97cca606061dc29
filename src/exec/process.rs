// src/exec/process.rs

//! One child process per run.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use tracing::{debug, warn};

use crate::cli::LogLevel;
use crate::config::RuntimePaths;
use crate::engine::ResultSlot;
use crate::errors::{Result, TickdError};
use crate::exec::{Launched, Launcher};
use crate::registry::WorkerSpec;
use crate::types::{LaunchMode, Params};

/// Re-invokes a tickd binary as `<exe> worker <id> --kind <kind> ...`.
///
/// The child gets the params as JSON on stdin and answers with its returned
/// params as JSON on stdout. Children are spawned with `std::process` and
/// never waited on here: they are reaped by the supervisor's SIGCHLD path.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    exe: PathBuf,
    uid: String,
    runtime_dir: PathBuf,
    log_level: Option<LogLevel>,
}

impl ProcessLauncher {
    pub fn new(exe: impl Into<PathBuf>, uid: impl Into<String>, runtime_dir: impl Into<PathBuf>) -> Self {
        Self {
            exe: exe.into(),
            uid: uid.into(),
            runtime_dir: runtime_dir.into(),
            log_level: None,
        }
    }

    /// Launcher for the running binary.
    pub fn current_exe(uid: &str, paths: &RuntimePaths) -> Result<Self> {
        Ok(Self::new(std::env::current_exe()?, uid, &paths.dir))
    }

    pub fn with_log_level(mut self, level: Option<LogLevel>) -> Self {
        self.log_level = level;
        self
    }

    fn command(&self, spec: &WorkerSpec) -> Command {
        let mut cmd = Command::new(&self.exe);
        cmd.arg("worker")
            .arg(&spec.id)
            .arg("--kind")
            .arg(&spec.kind)
            .arg("--uid")
            .arg(&self.uid)
            .arg("--runtime-dir")
            .arg(&self.runtime_dir);
        if let Some(level) = self.log_level {
            cmd.arg("--log-level").arg(level.as_str());
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        cmd
    }
}

impl Launcher for ProcessLauncher {
    fn mode(&self) -> LaunchMode {
        LaunchMode::Process
    }

    fn launch(&mut self, spec: &WorkerSpec, params: Params) -> Result<Launched> {
        let mut child = self
            .command(spec)
            .spawn()
            .map_err(|source| TickdError::LaunchFailed {
                worker: spec.id.clone(),
                source,
            })?;
        let pid = child.id();

        if let Some(mut stdin) = child.stdin.take() {
            let payload = serde_json::to_vec(&params)?;
            if let Err(e) = stdin.write_all(&payload) {
                warn!(worker = %spec.id, pid, "passing params to worker failed: {e}");
            }
        }

        let result = child
            .stdout
            .take()
            .and_then(|stdout| drain_output(&spec.id, pid, stdout));

        debug!(worker = %spec.id, pid, exe = ?self.exe, "spawned worker process");
        Ok(Launched::Child { pid, result })
    }
}

/// Drain a child's stdout on a helper thread so a chatty child can never
/// block on a full pipe. The bytes land in the returned slot once the pipe
/// closes; nothing here waits for that.
fn drain_output<R: Read + Send + 'static>(
    worker: &str,
    pid: u32,
    mut source: R,
) -> Option<ResultSlot> {
    let (tx, slot) = ResultSlot::channel();
    let spawned = thread::Builder::new()
        .name(format!("tickd-drain-{pid}"))
        .spawn(move || {
            let mut buf = Vec::new();
            let read = source.read_to_end(&mut buf).map(|_| buf);
            // The supervisor may have stopped listening; nothing to do then.
            let _ = tx.send(read);
        });
    match spawned {
        Ok(_) => Some(slot),
        Err(e) => {
            warn!(%worker, pid, "cannot collect worker result: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    use crate::engine::SlotPoll;

    #[test]
    fn command_line_carries_identity_and_kind() {
        let launcher = ProcessLauncher::new("/usr/bin/tickd", "mail", "/run/tickd")
            .with_log_level(Some(LogLevel::Debug));
        let spec = WorkerSpec {
            id: "digest".into(),
            kind: "command".into(),
            enabled: true,
            max_concurrent: 1,
            delay_ticks: 1,
            params: Params::new(),
        };
        let cmd = launcher.command(&spec);
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "worker", "digest", "--kind", "command", "--uid", "mail", "--runtime-dir",
                "/run/tickd", "--log-level", "debug"
            ]
        );
    }

    #[test]
    fn missing_binary_is_a_launch_failure() {
        let mut launcher = ProcessLauncher::new("/definitely/not/here/tickd", "daemon", "/tmp");
        let spec = WorkerSpec {
            id: "a".into(),
            kind: "heartbeat".into(),
            enabled: true,
            max_concurrent: 1,
            delay_ticks: 1,
            params: Params::new(),
        };
        match launcher.launch(&spec, Params::new()) {
            Err(TickdError::LaunchFailed { worker, .. }) => assert_eq!(worker, "a"),
            other => panic!("expected LaunchFailed, got {other:?}"),
        }
    }

    fn settle(slot: &ResultSlot, within: Duration) -> Option<Vec<u8>> {
        let deadline = Instant::now() + within;
        while Instant::now() < deadline {
            match slot.poll() {
                SlotPoll::Ready(bytes) => return Some(bytes.unwrap()),
                SlotPoll::Pending => thread::sleep(Duration::from_millis(10)),
                SlotPoll::Lost => return None,
            }
        }
        None
    }

    #[test]
    fn drained_output_arrives_in_the_slot() {
        let slot = drain_output("a", 1, Cursor::new(b"{\"a\":1}".to_vec())).unwrap();
        assert_eq!(settle(&slot, Duration::from_secs(5)).unwrap(), b"{\"a\":1}");
    }

    #[test]
    fn output_held_open_by_a_grandchild_does_not_block() {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("sleep 2 & echo partial; exit 0")
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        let pid = child.id();
        let slot = drain_output("bg", pid, child.stdout.take().unwrap()).unwrap();
        assert!(child.wait().unwrap().success());

        let started = Instant::now();
        assert!(matches!(slot.poll(), SlotPoll::Pending));
        assert!(started.elapsed() < Duration::from_millis(100));

        // The slot fills once the grandchild lets go of the pipe.
        assert_eq!(settle(&slot, Duration::from_secs(10)).unwrap(), b"partial\n");
    }
}
