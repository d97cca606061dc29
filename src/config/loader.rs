// src/config/loader.rs

use std::path::Path;

use crate::config::model::RawWorkerFile;
use crate::errors::{Result, TickdError};
use crate::fs::FileSystem;

/// Load one worker definition file and return the raw `RawWorkerFile`.
///
/// This only performs TOML deserialization; semantic checks (known kind,
/// non-zero delay) live in [`validate_worker`](crate::config::validate_worker).
pub fn load_worker_file(fs: &dyn FileSystem, path: &Path) -> Result<RawWorkerFile> {
    let contents = fs.read_to_string(path)?;

    toml::from_str(&contents).map_err(|e| {
        TickdError::ConfigError(format!("invalid worker definition {:?}: {e}", path))
    })
}
