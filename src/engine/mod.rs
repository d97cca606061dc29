// src/engine/mod.rs

//! Supervisor engine for tickd.
//!
//! This module ties together:
//! - the per-worker tick scheduler
//! - the process tracker (live child pids per worker)
//! - the signal router (child-exited, terminate, hangup)
//! - the async shell that turns ticks and OS signals into core calls
//!
//! The synchronous, deterministic core lives in [`core`]; the Tokio-driven
//! IO shell is implemented in [`runtime`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::types::WorkerId;

pub mod core;
pub mod router;
pub mod runtime;
pub mod scheduler;
pub mod tracker;

pub use self::core::Supervisor;
pub use router::{ChildExit, ExitState, LateResult, Reaped, Reaper, SignalRouter, WaitpidReaper};
pub use runtime::Runtime;
pub use scheduler::{Scheduler, WorkerRuntimeState};
pub use tracker::{ProcessTracker, ReleasedChild, ResultBytes, ResultSlot, SettledResult, SlotPoll};

/// Cooperative stop request, honoured at the top of the next loop iteration.
///
/// Cloning shares the flag, so a handle can be given out before the
/// supervisor starts running.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lifecycle of one supervisor process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Starting,
    Running,
    Stopping,
    Terminated,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SupervisorState::Starting => "starting",
            SupervisorState::Running => "running",
            SupervisorState::Stopping => "stopping",
            SupervisorState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// What one tick did, per worker that was due.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Child processes spawned.
    pub launched: Vec<WorkerId>,
    /// Inline runs that completed.
    pub completed: Vec<WorkerId>,
    /// Due, but the worker already had `max_concurrent` live children.
    pub at_capacity: Vec<WorkerId>,
    /// Spawn errors and failed inline runs.
    pub failed: Vec<WorkerId>,
    /// Due in inline mode after another worker already ran this tick.
    pub deferred: Vec<WorkerId>,
}

impl TickReport {
    /// Launch attempts made this tick. Deferred workers never got one.
    pub fn attempts(&self) -> usize {
        self.launched.len() + self.completed.len() + self.at_capacity.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts() == 0 && self.deferred.is_empty()
    }
}
