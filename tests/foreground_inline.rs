// tests/foreground_inline.rs

//! A full foreground run in inline mode, stopped by a real SIGTERM.
//!
//! Kept alone in its own test binary: it signals the whole test process.

use std::fs;
use std::path::Path;
use std::time::Duration;

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tickd::config::RuntimePaths;
use tickd::daemon::{self, ServiceContext, ServiceOutcome, StartOptions};
use tickd::registry::{DiscoveryOptions, Worker, WorkerRegistry};
use tickd::types::{LaunchMode, Params};
use tickd_test_utils::builders::write_worker;

/// Records what the marker says while running, then asks this process to
/// stop.
struct StopSelf;

impl Worker for StopSelf {
    fn run(&mut self, params: Params) -> anyhow::Result<Option<Params>> {
        let dir = params
            .get("dir")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("params.dir missing"))?;
        let dir = Path::new(dir);

        let marker = fs::read_to_string(dir.join("runtime").join("fg.pid"))?;
        fs::write(dir.join("seen"), marker)?;
        kill(Pid::this(), Signal::SIGTERM)?;
        Ok(None)
    }
}

#[test]
fn foreground_run_claims_marker_and_releases_it_on_sigterm() {
    let dir = tempfile::tempdir().unwrap();
    let paths = RuntimePaths::new(dir.path().join("runtime"), "fg");
    paths.ensure_dir().unwrap();

    let workers = dir.path().join("workers");
    write_worker(
        &workers,
        "stopper",
        &format!(
            "kind = \"stop-self\"\n[params]\ndir = {:?}\n",
            dir.path().to_string_lossy()
        ),
    );

    let mut registry = WorkerRegistry::builtin();
    registry.register("stop-self", || Box::new(StopSelf) as Box<dyn Worker>);

    let ctx = ServiceContext {
        uid: "fg".into(),
        paths: paths.clone(),
        registry,
        log_level: None,
    };
    let opts = StartOptions {
        discovery: DiscoveryOptions::new(&workers),
        foreground: true,
        mode: LaunchMode::Inline,
        interval: Duration::from_millis(10),
    };

    let outcome = daemon::start(&ctx, &opts).unwrap();
    assert_eq!(outcome, ServiceOutcome::Terminated);
    assert_eq!(outcome.exit_code(), 0);
    assert!(!paths.pid_file.exists());

    let seen = fs::read_to_string(dir.path().join("seen")).unwrap();
    assert_eq!(seen, Pid::this().as_raw().to_string());
}
