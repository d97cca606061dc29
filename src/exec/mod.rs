// src/exec/mod.rs

//! Worker launching layer.
//!
//! The supervisor core talks to a [`Launcher`] instead of spawning processes
//! itself, so tests can swap in a fake that never forks.
//!
//! - [`process`] re-invokes the current binary as `tickd worker <id>`, one
//!   child process per run, fire and forget.
//! - [`inline`] runs the worker synchronously inside the supervisor.
//! - [`child`] is the entry point on the other side of a process launch.

pub mod child;
pub mod inline;
pub mod process;

use crate::engine::ResultSlot;
use crate::errors::Result;
use crate::registry::WorkerSpec;
use crate::types::{LaunchMode, Params};

pub use child::run_worker_child;
pub use inline::InlineLauncher;
pub use process::ProcessLauncher;

/// Result of a successful launch.
#[derive(Debug)]
pub enum Launched {
    /// A child process now runs the worker. Its result slot, if any, is
    /// polled once the child has been reaped.
    Child {
        pid: u32,
        result: Option<ResultSlot>,
    },
    /// The worker already ran to completion.
    Inline { returned: Option<Params> },
}

/// Trait abstracting how a due worker is turned into a run.
///
/// Production code uses [`ProcessLauncher`] or [`InlineLauncher`]; tests
/// provide their own implementation that records launches.
pub trait Launcher: Send {
    fn mode(&self) -> LaunchMode;

    /// Start one run of `spec` with the given params.
    ///
    /// Process launchers must not wait for the child.
    fn launch(&mut self, spec: &WorkerSpec, params: Params) -> Result<Launched>;
}
