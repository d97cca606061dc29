// src/config/mod.rs

//! Configuration for tickd.
//!
//! Responsibilities:
//! - Define the TOML-backed worker definition model (`model.rs`).
//! - Load a definition file through the filesystem seam (`loader.rs`).
//! - Validate definitions into [`WorkerSpec`](crate::registry::WorkerSpec)s (`validate.rs`).
//! - Derive the per-identity runtime file layout (`paths.rs`).

pub mod loader;
pub mod model;
pub mod paths;
pub mod validate;

pub use loader::load_worker_file;
pub use model::RawWorkerFile;
pub use paths::RuntimePaths;
pub use validate::{validate_worker, validate_worker_id};
