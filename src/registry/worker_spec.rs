// src/registry/worker_spec.rs

use crate::types::{Params, WorkerId};

/// Validated, immutable description of one worker.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSpec {
    /// File stem of the definition; unique within one workers directory.
    pub id: WorkerId,
    /// Registered kind used to instantiate the worker.
    pub kind: String,
    pub enabled: bool,
    /// Upper bound on live child processes (process mode only).
    pub max_concurrent: u32,
    /// A launch is attempted every `delay_ticks` ticks. Always >= 1.
    pub delay_ticks: u64,
    /// Initial params; the scheduler keeps the evolving copy.
    pub params: Params,
}
