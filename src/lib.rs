// src/lib.rs

pub mod cli;
pub mod config;
pub mod daemon;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod guard;
pub mod logging;
pub mod registry;
pub mod types;

use std::io;
use std::time::Duration;

use tracing::debug;

use crate::cli::{CliArgs, Command, StartArgs};
use crate::config::RuntimePaths;
use crate::daemon::{ServiceContext, StartOptions};
use crate::errors::Result;
use crate::logging::{LogTarget, init_logging};
use crate::registry::{DiscoveryOptions, WorkerRegistry};
use crate::types::{EXIT_CODE_NORMAL, LaunchMode};

/// High-level entry point used by `main.rs`, with the built-in worker kinds.
pub fn run(args: CliArgs) -> Result<u8> {
    run_with_registry(args, WorkerRegistry::builtin())
}

/// Entry point for binaries that register their own worker kinds.
///
/// This wires together:
/// - runtime paths (created on demand, optionally clearing the log)
/// - logging (stdout for foreground runs, the log file otherwise)
/// - the service command or the worker child entry
///
/// Returns the process exit code.
pub fn run_with_registry(args: CliArgs, registry: WorkerRegistry) -> Result<u8> {
    let paths = RuntimePaths::new(&args.runtime_dir, &args.uid).absolutize()?;
    paths.ensure_dir()?;
    if args.clearlog {
        paths.clear_log()?;
    }

    let target = match &args.command {
        Command::Start(start) if start.foreground => LogTarget::Stdout,
        _ => LogTarget::File(paths.log_file.clone()),
    };
    init_logging(args.log_level, &target)?;
    debug!(uid = %args.uid, command = ?args.command, "tickd invoked");

    let ctx = ServiceContext {
        uid: args.uid,
        paths,
        registry,
        log_level: args.log_level,
    };

    let outcome = match args.command {
        Command::Start(start) => daemon::start(&ctx, &start_options(args.workersdir, start))?,
        Command::Stop => daemon::stop(&ctx)?,
        Command::Status => daemon::status(&ctx)?,
        Command::Worker(worker) => {
            exec::run_worker_child(
                &ctx.registry,
                &worker.id,
                &worker.kind,
                io::stdin().lock(),
                io::stdout().lock(),
            )?;
            return Ok(EXIT_CODE_NORMAL);
        }
    };

    outcome.report();
    Ok(outcome.exit_code())
}

fn start_options(workersdir: std::path::PathBuf, start: StartArgs) -> StartOptions {
    StartOptions {
        discovery: DiscoveryOptions {
            dir: workersdir,
            only: start.only,
        },
        foreground: start.foreground,
        mode: if start.inline {
            LaunchMode::Inline
        } else {
            LaunchMode::default()
        },
        interval: Duration::from_millis(start.interval_ms.max(1)),
    }
}
