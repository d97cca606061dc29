// src/daemon/mod.rs

//! Service commands: `start`, `stop` and `status`.
//!
//! Each command resolves the PID marker through the
//! [`SingletonGuard`](crate::guard::SingletonGuard) and returns a
//! [`ServiceOutcome`], which knows its operator message and exit code.

pub mod detach;

use std::time::Duration;

use nix::unistd::Pid;
use tracing::{debug, error, info, warn};

use crate::cli::LogLevel;
use crate::config::RuntimePaths;
use crate::engine::{Runtime, Supervisor, WaitpidReaper};
use crate::errors::{Result, TickdError};
use crate::exec::{InlineLauncher, ProcessLauncher};
use crate::fs::RealFileSystem;
use crate::guard::{Release, SingletonGuard};
use crate::registry::{DiscoveryOptions, WorkerRegistry, discover};
use crate::types::{EXIT_CODE_ERROR, EXIT_CODE_NORMAL, LaunchMode};

use self::detach::Branch;

/// Result of a service command as seen by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceOutcome {
    Started,
    AlreadyRunning,
    NoWorkers,
    ForkFailed,
    Stopped,
    NotRunningOnStop,
    Running,
    NotRunning,
    /// Parent side of a successful detach. The child reports for it.
    Detached,
    /// A supervisor run ended after a stop request.
    Terminated,
}

impl ServiceOutcome {
    pub fn message(self) -> &'static str {
        match self {
            ServiceOutcome::Started => "Starting service... OK.",
            ServiceOutcome::AlreadyRunning => "Starting service... Service is already running!",
            ServiceOutcome::NoWorkers => "Starting service... No tasks found. Stopping!",
            ServiceOutcome::ForkFailed => "Starting service... Could not start service!",
            ServiceOutcome::Stopped => "Stopping service... OK.",
            ServiceOutcome::NotRunningOnStop => "Stopping service... Service is not running!",
            ServiceOutcome::Running => "Service status: running.",
            ServiceOutcome::NotRunning => "Service status: not running!",
            ServiceOutcome::Detached => "",
            ServiceOutcome::Terminated => "Service terminated.",
        }
    }

    pub fn exit_code(self) -> u8 {
        match self {
            ServiceOutcome::NoWorkers
            | ServiceOutcome::ForkFailed
            | ServiceOutcome::NotRunningOnStop
            | ServiceOutcome::NotRunning => EXIT_CODE_ERROR,
            _ => EXIT_CODE_NORMAL,
        }
    }

    /// Echo the message to the console and the log.
    pub fn report(self) {
        match self {
            ServiceOutcome::Detached => {}
            ServiceOutcome::Terminated => info!("{}", self.message()),
            _ => {
                println!("{}", self.message());
                info!("{}", self.message());
            }
        }
    }
}

/// Everything the service commands share.
#[derive(Debug, Clone)]
pub struct ServiceContext {
    pub uid: String,
    pub paths: RuntimePaths,
    pub registry: WorkerRegistry,
    /// Forwarded to worker children.
    pub log_level: Option<LogLevel>,
}

impl ServiceContext {
    fn guard(&self) -> SingletonGuard {
        SingletonGuard::new(&self.paths.pid_file)
    }
}

#[derive(Debug, Clone)]
pub struct StartOptions {
    pub discovery: DiscoveryOptions,
    /// Stay attached instead of forking into the background.
    pub foreground: bool,
    pub mode: LaunchMode,
    pub interval: Duration,
}

/// `start`: refuse if a supervisor is alive, discover workers, then run the
/// loop either detached or in the foreground.
///
/// Returns in the calling process for every outcome. In the detached case
/// both the parent (`Detached`) and the supervisor child (`Terminated`,
/// after its loop ends) return from here.
pub fn start(ctx: &ServiceContext, opts: &StartOptions) -> Result<ServiceOutcome> {
    let mut guard = ctx.guard();

    if let Some(pid) = guard.resolve_running_pid()? {
        debug!(pid = pid.as_raw(), "supervisor already running");
        return Ok(ServiceOutcome::AlreadyRunning);
    }
    guard.clear_stale()?;

    let specs = discover(&RealFileSystem, &opts.discovery, &ctx.registry)?;
    let supervisor = match Supervisor::new(specs) {
        Ok(supervisor) => supervisor,
        Err(TickdError::NoWorkers) => return Ok(ServiceOutcome::NoWorkers),
        Err(e) => return Err(e),
    };

    if opts.foreground {
        let me = Pid::this();
        guard.claim(me)?;
        ServiceOutcome::Started.report();

        let res = run_supervisor(ctx, supervisor, opts);
        guard.release_if_owned(me)?;
        res?;
        return Ok(ServiceOutcome::Terminated);
    }

    match detach::fork_supervisor() {
        Err(e) => {
            error!("fork failed: {e}");
            Ok(ServiceOutcome::ForkFailed)
        }
        Ok(Branch::Parent(child)) => {
            guard.claim(child)?;
            Ok(ServiceOutcome::Detached)
        }
        Ok(Branch::Child) => {
            detach::become_session_leader()?;
            ServiceOutcome::Started.report();
            detach::redirect_stdio(&ctx.paths)?;

            run_supervisor(ctx, supervisor, opts)?;
            Ok(ServiceOutcome::Terminated)
        }
    }
}

/// `stop`: delete the marker and signal the supervisor it named.
///
/// A stale marker is removed and reported as "not running".
pub fn stop(ctx: &ServiceContext) -> Result<ServiceOutcome> {
    let mut guard = ctx.guard();

    match guard.resolve_running_pid()? {
        Some(pid) => {
            info!(pid = pid.as_raw(), "stopping supervisor");
            if let Release::SignalFailed(errno) = guard.release()? {
                // The marker is gone, so the service counts as stopped.
                warn!(pid = pid.as_raw(), %errno, "supervisor may still be running");
            }
            Ok(ServiceOutcome::Stopped)
        }
        None => {
            guard.clear_stale()?;
            Ok(ServiceOutcome::NotRunningOnStop)
        }
    }
}

/// `status`: read-only.
pub fn status(ctx: &ServiceContext) -> Result<ServiceOutcome> {
    match ctx.guard().resolve_running_pid()? {
        Some(_) => Ok(ServiceOutcome::Running),
        None => Ok(ServiceOutcome::NotRunning),
    }
}

/// Build a current-thread Tokio runtime and drive the supervisor until a
/// stop is requested.
///
/// Must only be called after any fork: the runtime is created here.
pub fn run_supervisor(
    ctx: &ServiceContext,
    supervisor: Supervisor,
    opts: &StartOptions,
) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let supervisor = match opts.mode {
        LaunchMode::Process => {
            let launcher = ProcessLauncher::current_exe(&ctx.uid, &ctx.paths)?
                .with_log_level(ctx.log_level);
            rt.block_on(Runtime::new(supervisor, launcher, WaitpidReaper, opts.interval).run())?
        }
        LaunchMode::Inline => {
            let launcher = InlineLauncher::new(ctx.registry.clone());
            rt.block_on(Runtime::new(supervisor, launcher, WaitpidReaper, opts.interval).run())?
        }
    };

    debug!(state = %supervisor.state(), "supervisor finished");
    Ok(())
}
