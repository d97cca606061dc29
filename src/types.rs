// src/types.rs

/// Stable identifier of a worker: the stem of its definition file.
pub type WorkerId = String;

/// Opaque key-value payload handed to every worker invocation.
///
/// A worker may return a new payload, which replaces the stored one and is
/// fed into its next invocation (cursors, offsets, counters).
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Exit code for successful or idempotent outcomes.
pub const EXIT_CODE_NORMAL: u8 = 0;

/// Exit code for "not running", "no tasks found" and start failures.
pub const EXIT_CODE_ERROR: u8 = 3;

/// How the scheduler turns a due worker into a running unit of work.
///
/// - `Process`: spawn an isolated child process per invocation, fire and
///   forget; completions are learnt from SIGCHLD.
/// - `Inline`: run the worker synchronously inside the supervisor, at most
///   once per tick, without concurrency caps. Used where process control is
///   unavailable or explicitly requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    Process,
    Inline,
}

impl Default for LaunchMode {
    fn default() -> Self {
        if cfg!(unix) {
            LaunchMode::Process
        } else {
            LaunchMode::Inline
        }
    }
}
