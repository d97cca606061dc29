use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};

use tickd::engine::{ResultSlot, StopFlag};
use tickd::errors::{Result, TickdError};
use tickd::exec::{Launched, Launcher};
use tickd::registry::WorkerSpec;
use tickd::types::{LaunchMode, Params, WorkerId};

/// One call to [`FakeLauncher::launch`].
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRecord {
    pub worker: WorkerId,
    /// Fake pid handed out in process mode.
    pub pid: Option<u32>,
    pub params: Params,
}

/// A fake launcher that:
/// - records which workers were launched and with which params
/// - hands out increasing fake pids in process mode (nothing is spawned)
/// - can fail chosen workers, or make them return params
/// - can request a stop after a number of launches
#[derive(Debug, Clone)]
pub struct FakeLauncher {
    mode: LaunchMode,
    next_pid: u32,
    launches: Arc<Mutex<Vec<LaunchRecord>>>,
    failing: HashSet<WorkerId>,
    results: HashMap<WorkerId, Params>,
    stop_after: Option<(usize, StopFlag)>,
}

impl FakeLauncher {
    pub fn process() -> Self {
        Self::with_mode(LaunchMode::Process)
    }

    pub fn inline() -> Self {
        Self::with_mode(LaunchMode::Inline)
    }

    fn with_mode(mode: LaunchMode) -> Self {
        Self {
            mode,
            next_pid: 1000,
            launches: Arc::new(Mutex::new(Vec::new())),
            failing: HashSet::new(),
            results: HashMap::new(),
            stop_after: None,
        }
    }

    /// Every launch of `worker` fails like a spawn error.
    pub fn failing(mut self, worker: &str) -> Self {
        self.failing.insert(worker.to_string());
        self
    }

    /// `worker` hands back `params` from every run.
    pub fn returning(mut self, worker: &str, params: Params) -> Self {
        self.results.insert(worker.to_string(), params);
        self
    }

    /// Request a stop once `n` launches (failed ones included) happened.
    pub fn stop_after(mut self, n: usize, stop: StopFlag) -> Self {
        self.stop_after = Some((n, stop));
        self
    }

    /// Shared handle to the launch log; stays valid after the launcher has
    /// been moved into a runtime.
    pub fn log(&self) -> Arc<Mutex<Vec<LaunchRecord>>> {
        Arc::clone(&self.launches)
    }

    pub fn launches(&self) -> Vec<LaunchRecord> {
        self.launches.lock().unwrap().clone()
    }

    pub fn launched_workers(&self) -> Vec<WorkerId> {
        self.launches().into_iter().map(|r| r.worker).collect()
    }

    pub fn pids_of(&self, worker: &str) -> Vec<u32> {
        self.launches()
            .into_iter()
            .filter(|r| r.worker == worker)
            .filter_map(|r| r.pid)
            .collect()
    }
}

impl Launcher for FakeLauncher {
    fn mode(&self) -> LaunchMode {
        self.mode
    }

    fn launch(&mut self, spec: &WorkerSpec, params: Params) -> Result<Launched> {
        let failing = self.failing.contains(&spec.id);
        let pid = (self.mode == LaunchMode::Process && !failing).then(|| {
            self.next_pid += 1;
            self.next_pid
        });

        let total = {
            let mut launches = self.launches.lock().unwrap();
            launches.push(LaunchRecord {
                worker: spec.id.clone(),
                pid,
                params,
            });
            launches.len()
        };
        if let Some((n, stop)) = &self.stop_after {
            if total >= *n {
                stop.request_stop();
            }
        }

        if failing {
            return Err(TickdError::LaunchFailed {
                worker: spec.id.clone(),
                source: io::Error::other("fake spawn failure"),
            });
        }

        let returned = self.results.get(&spec.id).cloned();
        Ok(match pid {
            Some(pid) => Launched::Child {
                pid,
                result: returned
                    .map(|params| ResultSlot::ready(serde_json::to_vec(&params).unwrap_or_default())),
            },
            None => Launched::Inline { returned },
        })
    }
}
