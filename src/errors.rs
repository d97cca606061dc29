// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TickdError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("System call failed: {0}")]
    Sys(#[from] nix::errno::Errno),

    #[error("No tasks found")]
    NoWorkers,

    #[error("Unknown worker kind '{kind}' for worker '{worker}'")]
    UnknownKind { worker: String, kind: String },

    #[error("Could not launch worker \"{worker}\": {source}")]
    LaunchFailed {
        worker: String,
        source: std::io::Error,
    },

    #[error("Max processes exceed for launch worker \"{0}\"")]
    CapacityExceeded(String),

    #[error("Worker \"{worker}\" failed: {reason}")]
    WorkerFailed { worker: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TickdError>;
