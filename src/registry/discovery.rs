// src/registry/discovery.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info};

use crate::config::{load_worker_file, validate_worker};
use crate::errors::{Result, TickdError};
use crate::fs::FileSystem;
use crate::registry::{WorkerRegistry, WorkerSpec};

/// Where and what to look for.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub dir: PathBuf,
    /// File-name globs; a file is taken if any of them matches.
    pub only: Vec<String>,
}

impl DiscoveryOptions {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            only: vec!["*.toml".to_string()],
        }
    }
}

/// Scan `opts.dir` for worker definitions.
///
/// A missing directory or one without matching files yields an empty list;
/// the caller decides what "no tasks found" means. Disabled workers are
/// dropped. A definition that fails to parse or validate is an error, and so
/// are two files with the same stem, since the stem is the worker id.
pub fn discover(
    fs: &dyn FileSystem,
    opts: &DiscoveryOptions,
    registry: &WorkerRegistry,
) -> Result<Vec<WorkerSpec>> {
    if !fs.is_dir(&opts.dir) {
        info!(dir = ?opts.dir, "workers directory not found");
        return Ok(Vec::new());
    }

    let matcher = build_matcher(&opts.only)?;

    let mut files: Vec<PathBuf> = fs
        .read_dir(&opts.dir)?
        .into_iter()
        .filter(|p| fs.is_file(p))
        .filter(|p| p.file_name().is_some_and(|name| matcher.is_match(name)))
        .collect();
    files.sort();

    let mut specs = Vec::with_capacity(files.len());
    let mut seen: HashMap<String, PathBuf> = HashMap::new();
    for path in files {
        let id = worker_id_from_path(&path)?;
        if let Some(first) = seen.get(&id) {
            return Err(TickdError::ConfigError(format!(
                "worker id '{id}' is defined by both {:?} and {:?}",
                first, path
            )));
        }
        seen.insert(id.clone(), path.clone());
        let raw = load_worker_file(fs, &path)?;
        let spec = validate_worker(&id, raw, registry)?;

        if !spec.enabled {
            debug!(worker = %spec.id, "worker disabled; skipping");
            continue;
        }
        debug!(worker = %spec.id, kind = %spec.kind, delay = spec.delay_ticks, "discovered worker");
        specs.push(spec);
    }

    Ok(specs)
}

fn build_matcher(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            TickdError::ConfigError(format!("invalid --only pattern '{pattern}': {e}"))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| TickdError::ConfigError(format!("building --only matcher: {e}")))
}

fn worker_id_from_path(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| TickdError::ConfigError(format!("cannot derive worker id from {:?}", path)))
}
