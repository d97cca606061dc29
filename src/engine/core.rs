// src/engine/core.rs

//! Synchronous supervisor core.
//!
//! [`Supervisor`] is the explicit context object shared by the tick loop and
//! the signal handling path. It owns the scheduler state, the process
//! tracker and the stop flag. Nothing in here touches Tokio, so every
//! scheduling rule can be unit tested with a fake launcher and reaper.
//!
//! The async shell (`engine::runtime::Runtime`) calls into it one event at a
//! time, so tracker updates never interleave with a tick.

use tracing::{debug, error, info, warn};

use crate::engine::router::{Reaper, SignalRouter};
use crate::engine::scheduler::Scheduler;
use crate::engine::tracker::ProcessTracker;
use crate::engine::{StopFlag, SupervisorState, TickReport};
use crate::errors::{Result, TickdError};
use crate::exec::{Launched, Launcher};
use crate::registry::WorkerSpec;
use crate::types::LaunchMode;

#[derive(Debug)]
pub struct Supervisor {
    scheduler: Scheduler,
    tracker: ProcessTracker,
    router: SignalRouter,
    stop: StopFlag,
    state: SupervisorState,
    /// Inline mode: first index considered for the next inline run.
    inline_cursor: usize,
}

impl Supervisor {
    /// Build a supervisor in the `Starting` state.
    ///
    /// Fails with [`TickdError::NoWorkers`] when there is nothing to run.
    pub fn new(specs: Vec<WorkerSpec>) -> Result<Self> {
        let scheduler = Scheduler::new(specs);
        if scheduler.is_empty() {
            return Err(TickdError::NoWorkers);
        }
        let stop = StopFlag::new();
        Ok(Self {
            scheduler,
            tracker: ProcessTracker::new(),
            router: SignalRouter::new(stop.clone()),
            stop,
            state: SupervisorState::Starting,
            inline_cursor: 0,
        })
    }

    /// Use an externally created stop flag.
    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.router = SignalRouter::new(stop.clone());
        self.stop = stop;
        self
    }

    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn tracker(&self) -> &ProcessTracker {
        &self.tracker
    }

    pub fn mark_running(&mut self) {
        self.transition(SupervisorState::Running);
    }

    /// Checked at the top of every loop iteration. Moves a running
    /// supervisor to `Stopping` once a stop was requested.
    pub fn should_stop(&mut self) -> bool {
        let stop = self.stop.is_set();
        if stop && self.state == SupervisorState::Running {
            self.transition(SupervisorState::Stopping);
        }
        stop
    }

    pub fn mark_terminated(&mut self) {
        if self.tracker.total_live() > 0 {
            info!(
                live = self.tracker.total_live(),
                "leaving running workers to finish on their own"
            );
        }
        self.transition(SupervisorState::Terminated);
    }

    /// One scheduler iteration over all workers in registry order.
    ///
    /// In process mode every due worker is launched unless it already has
    /// `max_concurrent` live children. In inline mode only one due worker
    /// runs, synchronously; the others stay due for the next tick and the
    /// pick rotates so no worker is starved. A failed launch is logged and
    /// never stops the iteration.
    ///
    /// Results that reaped children finished writing since the last event
    /// are applied first, so the launches see them.
    pub fn tick(&mut self, launcher: &mut dyn Launcher) -> TickReport {
        self.collect_results();
        match launcher.mode() {
            LaunchMode::Process => self.tick_processes(launcher),
            LaunchMode::Inline => self.tick_inline(launcher),
        }
    }

    fn tick_processes(&mut self, launcher: &mut dyn Launcher) -> TickReport {
        let mut report = TickReport::default();

        for idx in 0..self.scheduler.len() {
            if !self.scheduler.poll_due(idx) {
                continue;
            }
            let spec = self.scheduler.spec(idx);
            let live = self.tracker.live_count(&spec.id);
            if live >= spec.max_concurrent as usize {
                warn!(
                    worker = %spec.id,
                    live,
                    max = spec.max_concurrent,
                    "{}",
                    TickdError::CapacityExceeded(spec.id.clone())
                );
                report.at_capacity.push(spec.id.clone());
                continue;
            }
            self.launch(idx, launcher, &mut report);
        }

        report
    }

    fn tick_inline(&mut self, launcher: &mut dyn Launcher) -> TickReport {
        let mut report = TickReport::default();

        let due: Vec<usize> = (0..self.scheduler.len())
            .filter(|&idx| self.scheduler.poll_due(idx))
            .collect();
        let Some(&first) = due.first() else {
            return report;
        };
        let pick = due
            .iter()
            .copied()
            .find(|&idx| idx >= self.inline_cursor)
            .unwrap_or(first);

        for &idx in due.iter().filter(|&&idx| idx != pick) {
            self.scheduler.defer(idx);
            let id = self.scheduler.spec(idx).id.clone();
            debug!(worker = %id, "another worker runs inline this tick");
            report.deferred.push(id);
        }

        self.inline_cursor = pick + 1;
        self.launch(pick, launcher, &mut report);
        report
    }

    fn launch(&mut self, idx: usize, launcher: &mut dyn Launcher, report: &mut TickReport) {
        let spec = self.scheduler.spec(idx);
        let id = spec.id.clone();
        let params = self.scheduler.params(idx).clone();

        match launcher.launch(spec, params) {
            Ok(Launched::Child { pid, result }) => {
                debug!(worker = %id, pid, "launched worker");
                self.tracker.record(&id, pid, result);
                report.launched.push(id);
            }
            Ok(Launched::Inline { returned }) => {
                if let Some(params) = returned.filter(|p| !p.is_empty()) {
                    self.scheduler.set_params(idx, params);
                }
                debug!(worker = %id, "inline run finished");
                report.completed.push(id);
            }
            Err(e) => {
                error!(worker = %id, "{e}");
                report.failed.push(id);
            }
        }
    }

    /// Child-exited notification: reap everything that has exited and feed
    /// returned params into the next run. Returns how many tracked children
    /// were reaped.
    ///
    /// A child whose output is still open (a grandchild kept its stdout)
    /// is reaped anyway; its params are applied by a later
    /// [`collect_results`](Self::collect_results).
    pub fn on_child_exited(&mut self, reaper: &mut dyn Reaper) -> usize {
        let exits = self.router.on_child_exited(&mut self.tracker, reaper);
        for exit in &exits {
            if let Some(params) = &exit.returned {
                self.scheduler.update_params(&exit.worker, params.clone());
            }
        }
        self.collect_results();
        exits.len()
    }

    /// Apply params from reaped children whose output completed late.
    /// Returns how many were applied.
    pub fn collect_results(&mut self) -> usize {
        let late = self.router.collect_late_results(&mut self.tracker);
        for result in &late {
            self.scheduler.update_params(&result.worker, result.params.clone());
        }
        late.len()
    }

    pub fn on_terminate(&mut self) {
        info!("stop requested");
        self.router.on_terminate();
    }

    pub fn on_hangup(&mut self) {
        self.router.on_hangup();
    }

    fn transition(&mut self, next: SupervisorState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "supervisor {next}");
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::Sender;

    use crate::engine::router::Reaped;
    use crate::engine::tracker::{ResultBytes, ResultSlot};
    use crate::engine::ExitState;
    use crate::types::Params;

    /// Hands out pids whose output stays open until the test sends it.
    #[derive(Default)]
    struct HeldOpen {
        next_pid: u32,
        outputs: Vec<Sender<ResultBytes>>,
        seen: Vec<Params>,
    }

    impl Launcher for HeldOpen {
        fn mode(&self) -> LaunchMode {
            LaunchMode::Process
        }

        fn launch(&mut self, _spec: &WorkerSpec, params: Params) -> Result<Launched> {
            self.next_pid += 1;
            self.seen.push(params);
            let (tx, slot) = ResultSlot::channel();
            self.outputs.push(tx);
            Ok(Launched::Child {
                pid: self.next_pid,
                result: Some(slot),
            })
        }
    }

    struct Exited(Vec<u32>);

    impl Reaper for Exited {
        fn try_reap(&mut self) -> Result<Option<Reaped>> {
            Ok(self.0.pop().map(|pid| Reaped {
                pid,
                state: ExitState::Exited(0),
            }))
        }
    }

    fn worker(id: &str) -> WorkerSpec {
        WorkerSpec {
            id: id.into(),
            kind: "heartbeat".into(),
            enabled: true,
            max_concurrent: 1,
            delay_ticks: 1,
            params: Params::new(),
        }
    }

    #[test]
    fn empty_registry_is_rejected() {
        assert!(matches!(Supervisor::new(Vec::new()), Err(TickdError::NoWorkers)));
    }

    #[test]
    fn late_output_is_applied_on_a_later_event() {
        let mut sup = Supervisor::new(vec![worker("a")]).unwrap();
        let mut launcher = HeldOpen::default();

        sup.tick(&mut launcher);
        assert_eq!(sup.on_child_exited(&mut Exited(vec![1])), 1);
        assert_eq!(sup.tracker().total_live(), 0);
        assert_eq!(sup.tracker().awaited_results(), 1);
        assert!(sup.scheduler().params(0).is_empty());

        launcher.outputs[0].send(Ok(br#"{"cursor":5}"#.to_vec())).unwrap();
        sup.tick(&mut launcher);

        assert_eq!(launcher.seen.len(), 2);
        assert_eq!(launcher.seen[1]["cursor"], 5);
        assert_eq!(sup.tracker().awaited_results(), 0);
    }
}
