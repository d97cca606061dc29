// src/engine/router.rs

//! Signal Router: turns child-exited and terminate notifications into
//! tracker updates and a stop request.

use nix::errno::Errno;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use tracing::{debug, info, warn};

use crate::engine::StopFlag;
use crate::engine::tracker::{ProcessTracker, ResultBytes, SlotPoll};
use crate::errors::Result;
use crate::types::{Params, WorkerId};

/// How a reaped child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    Exited(i32),
    Signaled(i32),
}

impl ExitState {
    pub fn success(self) -> bool {
        self == ExitState::Exited(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaped {
    pub pid: u32,
    pub state: ExitState,
}

/// Non-blocking source of exited children.
///
/// Production uses [`WaitpidReaper`]; tests feed a scripted queue instead.
pub trait Reaper: Send {
    /// Collect one exited child, or `None` if none is waiting.
    fn try_reap(&mut self) -> Result<Option<Reaped>>;
}

/// `waitpid(-1, WNOHANG)` over all children of this process.
#[derive(Debug, Default, Clone, Copy)]
pub struct WaitpidReaper;

impl Reaper for WaitpidReaper {
    fn try_reap(&mut self) -> Result<Option<Reaped>> {
        loop {
            let reaped = match waitpid(None::<Pid>, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::Exited(pid, code)) => Reaped {
                    pid: pid.as_raw() as u32,
                    state: ExitState::Exited(code),
                },
                Ok(WaitStatus::Signaled(pid, signal, _)) => Reaped {
                    pid: pid.as_raw() as u32,
                    state: ExitState::Signaled(signal as i32),
                },
                Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => return Ok(None),
                Ok(_) | Err(Errno::EINTR) => continue,
                Err(e) => return Err(e.into()),
            };
            return Ok(Some(reaped));
        }
    }
}

/// One tracked child that was reaped.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildExit {
    pub worker: WorkerId,
    pub pid: u32,
    pub state: ExitState,
    /// Params the child handed back, if its output was complete at reap
    /// time.
    pub returned: Option<Params>,
}

/// Params handed back by a child whose output completed after it was
/// reaped.
#[derive(Debug, Clone, PartialEq)]
pub struct LateResult {
    pub worker: WorkerId,
    pub pid: u32,
    pub params: Params,
}

#[derive(Debug, Clone)]
pub struct SignalRouter {
    stop: StopFlag,
}

impl SignalRouter {
    pub fn new(stop: StopFlag) -> Self {
        Self { stop }
    }

    /// Terminate request: only flips the stop flag. Children are left alone.
    pub fn on_terminate(&self) {
        self.stop.request_stop();
    }

    pub fn on_hangup(&self) {
        info!("SIGHUP received; ignoring");
    }

    /// Reap every child that has exited so far.
    ///
    /// Several children may exit between two notifications, so this drains
    /// the reaper until it reports nothing. Pids the tracker does not know
    /// are skipped.
    pub fn on_child_exited(
        &self,
        tracker: &mut ProcessTracker,
        reaper: &mut dyn Reaper,
    ) -> Vec<ChildExit> {
        let mut exits = Vec::new();

        loop {
            let reaped = match reaper.try_reap() {
                Ok(Some(reaped)) => reaped,
                Ok(None) => break,
                Err(e) => {
                    warn!("reaping children failed: {e}");
                    break;
                }
            };

            let Some(child) = tracker.release(reaped.pid) else {
                debug!(pid = reaped.pid, "reaped untracked child");
                continue;
            };

            match reaped.state {
                ExitState::Exited(0) => {
                    debug!(worker = %child.worker, pid = reaped.pid, "worker finished")
                }
                ExitState::Exited(code) => {
                    warn!(worker = %child.worker, pid = reaped.pid, code, "worker exited with failure")
                }
                ExitState::Signaled(signal) => {
                    warn!(worker = %child.worker, pid = reaped.pid, signal, "worker killed by signal")
                }
            }

            let returned = match child.result.map(|slot| (slot.poll(), slot)) {
                None => None,
                Some((SlotPoll::Ready(bytes), _)) => parse_returned_params(&child.worker, bytes),
                Some((SlotPoll::Pending, slot)) => {
                    debug!(worker = %child.worker, pid = reaped.pid, "worker output still open; collecting later");
                    tracker.await_result(child.worker.clone(), reaped.pid, slot);
                    None
                }
                Some((SlotPoll::Lost, _)) => {
                    warn!(worker = %child.worker, pid = reaped.pid, "worker result was lost");
                    None
                }
            };

            exits.push(ChildExit {
                worker: child.worker,
                pid: reaped.pid,
                state: reaped.state,
                returned,
            });
        }

        exits
    }

    /// Results of already reaped children whose output has completed since
    /// the last call. Never waits for output that is still open.
    pub fn collect_late_results(&self, tracker: &mut ProcessTracker) -> Vec<LateResult> {
        tracker
            .take_settled()
            .into_iter()
            .filter_map(|settled| {
                let Some(bytes) = settled.bytes else {
                    warn!(worker = %settled.worker, pid = settled.pid, "worker result was lost");
                    return None;
                };
                let params = parse_returned_params(&settled.worker, bytes)?;
                debug!(worker = %settled.worker, pid = settled.pid, "late worker result collected");
                Some(LateResult {
                    worker: settled.worker,
                    pid: settled.pid,
                    params,
                })
            })
            .collect()
    }
}

fn parse_returned_params(worker: &str, bytes: ResultBytes) -> Option<Params> {
    let raw = match bytes {
        Ok(raw) => raw,
        Err(e) => {
            warn!(%worker, "reading worker result failed: {e}");
            return None;
        }
    };
    if raw.trim_ascii().is_empty() {
        return None;
    }
    match serde_json::from_slice::<Params>(&raw) {
        Ok(params) if !params.is_empty() => Some(params),
        Ok(_) => None,
        Err(e) => {
            warn!(%worker, "ignoring malformed worker result: {e}");
            None
        }
    }
}
