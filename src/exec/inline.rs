// src/exec/inline.rs

//! Runs workers inside the supervisor process.

use std::panic::{self, AssertUnwindSafe};

use crate::errors::{Result, TickdError};
use crate::exec::{Launched, Launcher};
use crate::registry::{WorkerRegistry, WorkerSpec};
use crate::types::{LaunchMode, Params};

/// Synchronous, in-process launcher.
///
/// Used with `--inline` and wherever process control is unavailable. A
/// worker error or panic becomes a [`TickdError::WorkerFailed`] for that run
/// only.
#[derive(Debug, Clone)]
pub struct InlineLauncher {
    registry: WorkerRegistry,
}

impl InlineLauncher {
    pub fn new(registry: WorkerRegistry) -> Self {
        Self { registry }
    }
}

impl Launcher for InlineLauncher {
    fn mode(&self) -> LaunchMode {
        LaunchMode::Inline
    }

    fn launch(&mut self, spec: &WorkerSpec, params: Params) -> Result<Launched> {
        let mut worker = self
            .registry
            .create(&spec.kind)
            .ok_or_else(|| TickdError::UnknownKind {
                worker: spec.id.clone(),
                kind: spec.kind.clone(),
            })?;

        let failed = |reason: String| TickdError::WorkerFailed {
            worker: spec.id.clone(),
            reason,
        };

        match panic::catch_unwind(AssertUnwindSafe(|| worker.run(params))) {
            Ok(Ok(returned)) => Ok(Launched::Inline { returned }),
            Ok(Err(e)) => Err(failed(format!("{e:#}"))),
            Err(_) => Err(failed("worker panicked".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Worker;

    struct Boom;

    impl Worker for Boom {
        fn run(&mut self, _params: Params) -> anyhow::Result<Option<Params>> {
            panic!("boom");
        }
    }

    fn spec(kind: &str) -> WorkerSpec {
        WorkerSpec {
            id: "w".into(),
            kind: kind.into(),
            enabled: true,
            max_concurrent: 1,
            delay_ticks: 1,
            params: Params::new(),
        }
    }

    #[test]
    fn heartbeat_returns_updated_params() {
        let mut launcher = InlineLauncher::new(WorkerRegistry::builtin());
        match launcher.launch(&spec("heartbeat"), Params::new()).unwrap() {
            Launched::Inline { returned } => assert_eq!(returned.unwrap()["count"], 1),
            other => panic!("expected inline run, got {other:?}"),
        }
    }

    #[test]
    fn panicking_worker_is_contained() {
        let mut registry = WorkerRegistry::new();
        registry.register("boom", || Box::new(Boom) as Box<dyn Worker>);
        let mut launcher = InlineLauncher::new(registry);

        let err = launcher.launch(&spec("boom"), Params::new()).unwrap_err();
        assert!(err.to_string().contains("worker panicked"));
    }
}
