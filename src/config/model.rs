// src/config/model.rs

use serde::Deserialize;

use crate::types::Params;

/// One worker definition as read from `<workersdir>/<id>.toml`.
///
/// ```toml
/// kind = "command"
/// active = true
/// max_processes = 2
/// delay = 30
///
/// [params]
/// command = "echo tick"
/// ```
///
/// Only `kind` is required. The worker id is not part of the file: it is
/// the file stem, so renaming the file renames the worker.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawWorkerFile {
    /// Registered worker kind to instantiate for each run.
    pub kind: String,

    /// Disabled workers are dropped at discovery time.
    #[serde(default = "default_active")]
    pub active: bool,

    /// Maximum number of live child processes for this worker.
    #[serde(default = "default_max_processes")]
    pub max_processes: u32,

    /// Ticks between two launch attempts.
    #[serde(default = "default_delay")]
    pub delay: u64,

    /// Payload handed to the first run.
    #[serde(default)]
    pub params: Params,
}

fn default_active() -> bool {
    true
}

fn default_max_processes() -> u32 {
    1
}

fn default_delay() -> u64 {
    60
}
