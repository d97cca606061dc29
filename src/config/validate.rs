// src/config/validate.rs

use crate::config::model::RawWorkerFile;
use crate::errors::{Result, TickdError};
use crate::registry::{WorkerRegistry, WorkerSpec};

/// Turn a raw definition into a [`WorkerSpec`], rejecting anything the
/// scheduler could not honour.
pub fn validate_worker(
    id: &str,
    raw: RawWorkerFile,
    registry: &WorkerRegistry,
) -> Result<WorkerSpec> {
    validate_worker_id(id)?;

    if raw.delay == 0 {
        return Err(TickdError::ConfigError(format!(
            "worker '{id}': delay must be >= 1 (got 0)"
        )));
    }

    if raw.max_processes == 0 {
        return Err(TickdError::ConfigError(format!(
            "worker '{id}': max_processes must be >= 1 (got 0)"
        )));
    }

    if !registry.contains(&raw.kind) {
        return Err(TickdError::UnknownKind {
            worker: id.to_string(),
            kind: raw.kind,
        });
    }

    Ok(WorkerSpec {
        id: id.to_string(),
        kind: raw.kind,
        enabled: raw.active,
        max_concurrent: raw.max_processes,
        delay_ticks: raw.delay,
        params: raw.params,
    })
}

/// Worker ids end up on child command lines and in log lines.
pub fn validate_worker_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && !id.starts_with('-')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));

    if valid {
        Ok(())
    } else {
        Err(TickdError::ConfigError(format!(
            "invalid worker id '{id}' (allowed: letters, digits, '_', '-', '.')"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(kind: &str, delay: u64, max_processes: u32) -> RawWorkerFile {
        RawWorkerFile {
            kind: kind.to_string(),
            active: true,
            max_processes,
            delay,
            params: Default::default(),
        }
    }

    #[test]
    fn zero_delay_is_rejected() {
        let err = validate_worker("a", raw("heartbeat", 0, 1), &WorkerRegistry::builtin())
            .unwrap_err();
        assert!(err.to_string().contains("delay must be >= 1"));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = validate_worker("a", raw("heartbeat", 1, 0), &WorkerRegistry::builtin())
            .unwrap_err();
        assert!(err.to_string().contains("max_processes"));
    }

    #[test]
    fn unknown_kind_names_the_worker() {
        match validate_worker("mailer", raw("smtp", 1, 1), &WorkerRegistry::builtin()) {
            Err(TickdError::UnknownKind { worker, kind }) => {
                assert_eq!(worker, "mailer");
                assert_eq!(kind, "smtp");
            }
            other => panic!("expected UnknownKind, got {other:?}"),
        }
    }

    #[test]
    fn ids_that_look_like_flags_are_rejected() {
        assert!(validate_worker_id("-x").is_err());
        assert!(validate_worker_id("has space").is_err());
        assert!(validate_worker_id("report.daily_v2").is_ok());
    }
}
