// tests/process_launch.rs

//! Process-mode launches against the real `tickd` binary.

use std::thread;
use std::time::{Duration, Instant};

use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::Pid;
use tickd::engine::{ExitState, Reaped, Reaper, ResultSlot, SlotPoll, Supervisor};
use tickd::errors::Result;
use tickd::exec::{Launched, Launcher, ProcessLauncher};
use tickd::types::Params;
use tickd_test_utils::builders::{WorkerSpecBuilder, params};

/// Blocks on the given pids one by one; never touches other children.
struct WaitFor(Vec<u32>);

impl Reaper for WaitFor {
    fn try_reap(&mut self) -> Result<Option<Reaped>> {
        let Some(pid) = self.0.pop() else {
            return Ok(None);
        };
        let state = match waitpid(Pid::from_raw(pid as i32), None)? {
            WaitStatus::Exited(_, code) => ExitState::Exited(code),
            WaitStatus::Signaled(_, signal, _) => ExitState::Signaled(signal as i32),
            other => panic!("unexpected wait status {other:?}"),
        };
        Ok(Some(Reaped { pid, state }))
    }
}

/// Poll until the child's output has been fully drained.
fn settled_output(slot: &ResultSlot) -> Vec<u8> {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        match slot.poll() {
            SlotPoll::Ready(bytes) => return bytes.unwrap(),
            SlotPoll::Lost => panic!("drain thread went away"),
            SlotPoll::Pending if Instant::now() < deadline => {
                thread::sleep(Duration::from_millis(10))
            }
            SlotPoll::Pending => panic!("worker output never completed"),
        }
    }
}

fn launcher(dir: &tempfile::TempDir) -> ProcessLauncher {
    ProcessLauncher::new(env!("CARGO_BIN_EXE_tickd"), "proc", dir.path())
}

#[test]
fn child_receives_params_and_hands_back_its_result() {
    let dir = tempfile::tempdir().unwrap();
    let mut launcher = launcher(&dir);
    let spec = WorkerSpecBuilder::new("pulse").build();

    let launched = launcher.launch(&spec, params([("count", 41)])).unwrap();
    let Launched::Child { pid, result } = launched else {
        panic!("expected a child process");
    };

    let status = waitpid(Pid::from_raw(pid as i32), None).unwrap();
    assert!(matches!(status, WaitStatus::Exited(_, 0)));

    let raw = settled_output(&result.unwrap());
    let returned: Params = serde_json::from_slice(&raw).unwrap();
    assert_eq!(returned["count"], 42);

    // The child logs into the shared runtime log.
    assert!(dir.path().join("proc.log").exists());
}

#[test]
fn failing_command_worker_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    let mut launcher = launcher(&dir);
    let spec = WorkerSpecBuilder::new("broken")
        .kind("command")
        .param("command", "exit 4")
        .build();

    let Launched::Child { pid, .. } = launcher.launch(&spec, spec.params.clone()).unwrap() else {
        panic!("expected a child process");
    };
    let status = waitpid(Pid::from_raw(pid as i32), None).unwrap();
    assert!(matches!(status, WaitStatus::Exited(_, code) if code != 0));
}

#[test]
fn supervisor_threads_params_across_child_processes() {
    let dir = tempfile::tempdir().unwrap();
    let mut launcher = launcher(&dir);
    let spec = WorkerSpecBuilder::new("pulse").build();
    let mut supervisor = Supervisor::new(vec![spec]).unwrap();

    for expected in 1..=3u64 {
        let report = supervisor.tick(&mut launcher);
        assert_eq!(report.launched, vec!["pulse"]);

        let mut reaper = WaitFor(supervisor.tracker().live_pids("pulse"));
        assert_eq!(supervisor.on_child_exited(&mut reaper), 1);

        // The output may still be draining right after the reap.
        let deadline = Instant::now() + Duration::from_secs(10);
        while supervisor.scheduler().params(0).get("count") != Some(&serde_json::Value::from(expected)) {
            assert!(Instant::now() < deadline, "count {expected} never arrived");
            thread::sleep(Duration::from_millis(10));
            supervisor.collect_results();
        }
    }
}
