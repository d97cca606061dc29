// src/registry/builtin.rs

//! Worker kinds shipped with tickd.

use std::process::Command;

use anyhow::{Context, anyhow, bail};
use serde_json::Value;
use tracing::{info, warn};

use crate::registry::Worker;
use crate::types::Params;

pub const COMMAND_KIND: &str = "command";
pub const HEARTBEAT_KIND: &str = "heartbeat";

/// Runs `params.command` through `sh -c` and logs what it printed.
#[derive(Debug, Default)]
pub struct CommandWorker;

impl Worker for CommandWorker {
    fn run(&mut self, params: Params) -> anyhow::Result<Option<Params>> {
        let command = params
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("params.command must be a string"))?;

        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .with_context(|| format!("spawning sh -c {command:?}"))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            info!(%command, "{line}");
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            warn!(%command, "{line}");
        }

        if !output.status.success() {
            bail!("command {command:?} exited with {}", output.status);
        }

        Ok(None)
    }
}

/// Logs a heartbeat and threads a run counter through its params.
#[derive(Debug, Default)]
pub struct HeartbeatWorker;

impl Worker for HeartbeatWorker {
    fn run(&mut self, mut params: Params) -> anyhow::Result<Option<Params>> {
        let count = params.get("count").and_then(Value::as_u64).unwrap_or(0) + 1;
        let message = params
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("alive");

        info!(count, "heartbeat: {message}");

        params.insert("count".to_string(), Value::from(count));
        Ok(Some(params))
    }
}
