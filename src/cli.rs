// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! The `start`, `stop` and `status` verbs drive the supervisor through its
//! PID marker. The hidden `worker` verb is how the supervisor re-invokes its
//! own binary for one unit of work.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `tickd`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tickd",
    version,
    about = "Run periodic workers as child processes under a single supervisor.",
    long_about = None
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Supervisor identity. Different UIDs run independent supervisors.
    #[arg(short = 'u', long, global = true, value_name = "ID", default_value = "daemon")]
    pub uid: String,

    /// Directory scanned for worker definition files.
    #[arg(
        short = 'w',
        long,
        global = true,
        value_name = "PATH",
        default_value = "daemon"
    )]
    pub workersdir: PathBuf,

    /// Directory holding `<uid>.pid`, `<uid>.log` and `<uid>_error.log`.
    #[arg(
        short = 'r',
        long = "runtime-dir",
        global = true,
        value_name = "PATH",
        default_value = "runtime"
    )]
    pub runtime_dir: PathBuf,

    /// Delete the log file before running the command.
    #[arg(short = 'c', long, global = true)]
    pub clearlog: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TICKD_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Start the supervisor unless one is already running.
    Start(StartArgs),
    /// Stop a running supervisor.
    Stop,
    /// Report whether a supervisor is running.
    Status,
    /// Run a single worker invocation (used by the supervisor itself).
    #[command(hide = true)]
    Worker(WorkerArgs),
}

#[derive(Debug, Clone, Args)]
pub struct StartArgs {
    /// Stay attached to the terminal instead of detaching.
    #[arg(long)]
    pub foreground: bool,

    /// Run workers inside the supervisor, one per tick, without child processes.
    #[arg(long)]
    pub inline: bool,

    /// Glob(s) selecting worker definition files by name.
    #[arg(long = "only", value_name = "GLOB", default_value = "*.toml")]
    pub only: Vec<String>,

    /// Length of one scheduler tick in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Args)]
pub struct WorkerArgs {
    /// Worker id (definition file stem).
    pub id: String,

    /// Registered worker kind to instantiate.
    #[arg(long, value_name = "KIND")]
    pub kind: String,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Spelling accepted by `--log-level`, used when re-invoking the binary.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
