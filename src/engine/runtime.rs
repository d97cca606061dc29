// src/engine/runtime.rs

use std::fmt;
use std::time::Duration;

use tokio::signal::unix::{SignalKind, signal};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::Launcher;

use super::core::Supervisor;
use super::router::Reaper;

/// Drives a [`Supervisor`] from a fixed-interval tick and OS signals, and
/// delegates launching to a [`Launcher`].
///
/// This is a pure IO shell around `Supervisor`, which holds all the
/// scheduling semantics. Exactly one event is handled per loop iteration:
/// - tick: run one scheduler iteration
/// - SIGTERM / SIGINT: request a stop
/// - SIGHUP: logged and ignored
/// - SIGCHLD: reap exited children
///
/// Intended for a current-thread runtime; the loop itself never blocks on a
/// worker.
pub struct Runtime<L: Launcher, R: Reaper> {
    supervisor: Supervisor,
    launcher: L,
    reaper: R,
    interval: Duration,
}

impl<L: Launcher, R: Reaper> fmt::Debug for Runtime<L, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("supervisor", &self.supervisor)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl<L: Launcher, R: Reaper> Runtime<L, R> {
    pub fn new(supervisor: Supervisor, launcher: L, reaper: R, interval: Duration) -> Self {
        Self {
            supervisor,
            launcher,
            reaper,
            interval,
        }
    }

    /// Main loop. Returns the supervisor in the `Terminated` state.
    pub async fn run(mut self) -> Result<Supervisor> {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sighup = signal(SignalKind::hangup())?;
        let mut sigchld = signal(SignalKind::child())?;

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            mode = ?self.launcher.mode(),
            workers = self.supervisor.scheduler().len(),
            interval_ms = self.interval.as_millis() as u64,
            "tickd runtime started"
        );
        self.supervisor.mark_running();

        loop {
            if self.supervisor.should_stop() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.supervisor.tick(&mut self.launcher);
                    if !report.is_empty() {
                        debug!(?report, "tick");
                    }
                }
                _ = sigterm.recv() => {
                    info!("SIGTERM received");
                    self.supervisor.on_terminate();
                }
                _ = sigint.recv() => {
                    info!("SIGINT received");
                    self.supervisor.on_terminate();
                }
                _ = sighup.recv() => {
                    self.supervisor.on_hangup();
                }
                _ = sigchld.recv() => {
                    let reaped = self.supervisor.on_child_exited(&mut self.reaper);
                    debug!(reaped, "SIGCHLD handled");
                }
            }
        }

        self.supervisor.mark_terminated();
        info!("runtime exiting");
        Ok(self.supervisor)
    }
}
