// src/exec/child.rs

//! Child side of a process launch (`tickd worker <id> --kind <kind>`).

use std::io::{Read, Write};

use tracing::{debug, error};

use crate::config::validate_worker_id;
use crate::errors::{Result, TickdError};
use crate::registry::WorkerRegistry;
use crate::types::Params;

/// Run one unit of work.
///
/// Reads the params as JSON from `input` (empty input means no params),
/// runs the worker and writes any returned params as JSON to `output`.
pub fn run_worker_child(
    registry: &WorkerRegistry,
    id: &str,
    kind: &str,
    mut input: impl Read,
    mut output: impl Write,
) -> Result<()> {
    validate_worker_id(id)?;

    let mut raw = String::new();
    input.read_to_string(&mut raw)?;
    let params: Params = if raw.trim().is_empty() {
        Params::new()
    } else {
        serde_json::from_str(&raw)?
    };

    let mut worker = registry.create(kind).ok_or_else(|| TickdError::UnknownKind {
        worker: id.to_string(),
        kind: kind.to_string(),
    })?;

    debug!(worker = %id, %kind, "worker run starting");
    match worker.run(params) {
        Ok(Some(returned)) => {
            serde_json::to_writer(&mut output, &returned)?;
            output.flush()?;
        }
        Ok(None) => {}
        Err(e) => {
            error!(worker = %id, "{e:#}");
            return Err(TickdError::WorkerFailed {
                worker: id.to_string(),
                reason: format!("{e:#}"),
            });
        }
    }
    debug!(worker = %id, "worker run finished");
    Ok(())
}
