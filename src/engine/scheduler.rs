// src/engine/scheduler.rs

//! Tick/modulo scheduling state, one entry per worker in registry order.

use crate::registry::WorkerSpec;
use crate::types::Params;

/// Mutable per-worker scheduling state.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerRuntimeState {
    pub tick_counter: u64,
    /// Params handed to the next run. Starts as the definition's params.
    pub last_params: Params,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    specs: Vec<WorkerSpec>,
    states: Vec<WorkerRuntimeState>,
}

impl Scheduler {
    pub fn new(specs: Vec<WorkerSpec>) -> Self {
        let states = specs
            .iter()
            .map(|spec| WorkerRuntimeState {
                tick_counter: 0,
                last_params: spec.params.clone(),
            })
            .collect();
        Self { specs, states }
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn spec(&self, idx: usize) -> &WorkerSpec {
        &self.specs[idx]
    }

    pub fn state(&self, idx: usize) -> &WorkerRuntimeState {
        &self.states[idx]
    }

    /// Evaluate worker `idx` for the current tick.
    ///
    /// Due when `tick_counter % delay_ticks == 0`, in which case the counter
    /// is reset. The counter is incremented afterwards either way, so a
    /// worker with `delay_ticks = 1` is due on every tick starting with the
    /// first. Disabled workers are never due.
    pub fn poll_due(&mut self, idx: usize) -> bool {
        let spec = &self.specs[idx];
        if !spec.enabled {
            return false;
        }
        let delay = spec.delay_ticks.max(1);
        let state = &mut self.states[idx];

        let due = state.tick_counter % delay == 0;
        if due {
            state.tick_counter = 0;
        }
        state.tick_counter += 1;
        due
    }

    /// Keep worker `idx` due on the next tick after it was skipped.
    pub fn defer(&mut self, idx: usize) {
        self.states[idx].tick_counter = 0;
    }

    pub fn params(&self, idx: usize) -> &Params {
        &self.states[idx].last_params
    }

    pub fn set_params(&mut self, idx: usize, params: Params) {
        self.states[idx].last_params = params;
    }

    /// Replace the params of the worker named `worker`. Returns false when
    /// no such worker is scheduled.
    pub fn update_params(&mut self, worker: &str, params: Params) -> bool {
        match self.specs.iter().position(|spec| spec.id == worker) {
            Some(idx) => {
                self.set_params(idx, params);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: &str, delay: u64) -> WorkerSpec {
        WorkerSpec {
            id: id.to_string(),
            kind: "heartbeat".to_string(),
            enabled: true,
            max_concurrent: 1,
            delay_ticks: delay,
            params: Params::new(),
        }
    }

    fn due_ticks(delay: u64, ticks: usize) -> Vec<usize> {
        let mut scheduler = Scheduler::new(vec![spec("a", delay)]);
        (1..=ticks).filter(|_| scheduler.poll_due(0)).collect()
    }

    #[test]
    fn delay_one_is_due_every_tick() {
        assert_eq!(due_ticks(1, 4), vec![1, 2, 3, 4]);
    }

    #[test]
    fn delay_three_is_due_on_first_then_every_third() {
        assert_eq!(due_ticks(3, 9), vec![1, 4, 7]);
    }

    #[test]
    fn disabled_worker_is_never_due() {
        let mut s = spec("a", 1);
        s.enabled = false;
        let mut scheduler = Scheduler::new(vec![s]);
        assert!(!scheduler.poll_due(0));
        assert_eq!(scheduler.state(0).tick_counter, 0);
    }

    #[test]
    fn update_params_targets_by_id() {
        let mut scheduler = Scheduler::new(vec![spec("a", 1), spec("b", 1)]);
        let mut params = Params::new();
        params.insert("offset".into(), 5.into());

        assert!(scheduler.update_params("b", params.clone()));
        assert!(!scheduler.update_params("zzz", Params::new()));
        assert_eq!(scheduler.params(1), &params);
        assert!(scheduler.params(0).is_empty());
    }
}
