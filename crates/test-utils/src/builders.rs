#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tickd::registry::WorkerSpec;
use tickd::types::Params;

/// Builder for `WorkerSpec` to simplify test setup.
///
/// Defaults: kind `heartbeat`, enabled, one process, delay 1, no params.
pub struct WorkerSpecBuilder {
    spec: WorkerSpec,
}

impl WorkerSpecBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            spec: WorkerSpec {
                id: id.to_string(),
                kind: "heartbeat".to_string(),
                enabled: true,
                max_concurrent: 1,
                delay_ticks: 1,
                params: Params::new(),
            },
        }
    }

    pub fn kind(mut self, kind: &str) -> Self {
        self.spec.kind = kind.to_string();
        self
    }

    pub fn delay(mut self, ticks: u64) -> Self {
        self.spec.delay_ticks = ticks;
        self
    }

    pub fn max_processes(mut self, max: u32) -> Self {
        self.spec.max_concurrent = max;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.spec.enabled = false;
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.spec.params.insert(key.to_string(), value.into());
        self
    }

    pub fn build(self) -> WorkerSpec {
        self.spec
    }
}

/// Build a `Params` map from key/value pairs.
pub fn params<I, K, V>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Write `<dir>/<id>.toml` with the given contents and return its path.
pub fn write_worker(dir: &Path, id: &str, toml: &str) -> PathBuf {
    fs::create_dir_all(dir).expect("create workers dir");
    let path = dir.join(format!("{id}.toml"));
    fs::write(&path, toml).expect("write worker definition");
    path
}
