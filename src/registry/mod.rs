// src/registry/mod.rs

//! Worker registry.
//!
//! Worker kinds are registered explicitly as factory functions keyed by a
//! kind name. A worker definition file names its kind; the supervisor (or a
//! worker child process) asks the registry for a fresh instance per run.

use std::collections::BTreeMap;
use std::fmt;

use crate::types::Params;

pub mod builtin;
pub mod discovery;
pub mod worker_spec;

pub use discovery::{DiscoveryOptions, discover};
pub use worker_spec::WorkerSpec;

/// One unit of repeatable work.
///
/// `run` receives the current params. Returning `Some(params)` replaces the
/// stored params for the next invocation of the same worker.
pub trait Worker: Send {
    fn run(&mut self, params: Params) -> anyhow::Result<Option<Params>>;
}

/// Builds a fresh worker instance.
pub type WorkerFactory = fn() -> Box<dyn Worker>;

/// Map from kind name to factory.
#[derive(Clone, Default)]
pub struct WorkerRegistry {
    factories: BTreeMap<String, WorkerFactory>,
}

impl fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl WorkerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the kinds shipped in [`builtin`].
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(builtin::COMMAND_KIND, || {
            Box::new(builtin::CommandWorker) as Box<dyn Worker>
        });
        registry.register(builtin::HEARTBEAT_KIND, || {
            Box::new(builtin::HeartbeatWorker) as Box<dyn Worker>
        });
        registry
    }

    /// Register (or replace) a kind.
    pub fn register(&mut self, kind: impl Into<String>, factory: WorkerFactory) -> &mut Self {
        self.factories.insert(kind.into(), factory);
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kind names in sorted order.
    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Instantiate a worker of the given kind.
    pub fn create(&self, kind: &str) -> Option<Box<dyn Worker>> {
        self.factories.get(kind).map(|factory| factory())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Worker for Echo {
        fn run(&mut self, params: Params) -> anyhow::Result<Option<Params>> {
            Ok(Some(params))
        }
    }

    #[test]
    fn builtin_kinds_are_registered() {
        let registry = WorkerRegistry::builtin();
        assert_eq!(registry.kinds(), vec!["command", "heartbeat"]);
        assert!(registry.create("nope").is_none());
    }

    #[test]
    fn custom_kinds_can_be_added() {
        let mut registry = WorkerRegistry::new();
        registry.register("echo", || Box::new(Echo) as Box<dyn Worker>);

        let mut params = Params::new();
        params.insert("k".into(), "v".into());

        let mut worker = registry.create("echo").unwrap();
        let out = worker.run(params.clone()).unwrap();
        assert_eq!(out, Some(params));
    }
}
