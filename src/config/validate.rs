// src/config/validate.rs

use crate::config::model::{ExecutorSection, KernConfig, RawKernConfig, StoreSection};
use crate::errors::{KernError, Result};
use crate::types::StoreKind;

impl TryFrom<RawKernConfig> for KernConfig {
    type Error = KernError;

    fn try_from(raw: RawKernConfig) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(KernConfig::new_unchecked(raw.store, raw.executor))
    }
}

/// Semantic checks on a freshly parsed `Kern.toml`.
pub fn validate_config(cfg: &RawKernConfig) -> Result<()> {
    validate_store(&cfg.store)?;
    validate_executor(&cfg.executor)?;
    Ok(())
}

fn validate_store(store: &StoreSection) -> Result<()> {
    validate_segment("store.organization", &store.organization)?;
    validate_segment("store.project", &store.project)?;

    if store.kind == StoreKind::File && store.output.as_os_str().is_empty() {
        return Err(KernError::Config(
            "store.output must not be empty for the file store".to_string(),
        ));
    }
    Ok(())
}

/// Organization and project names become single directory names.
fn validate_segment(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(KernError::Config(format!("{field} must not be empty")));
    }
    if value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(KernError::Config(format!(
            "{field} must be a plain name, got '{value}'"
        )));
    }
    Ok(())
}

fn validate_executor(executor: &ExecutorSection) -> Result<()> {
    if executor.max_parallel == 0 {
        return Err(KernError::Config(
            "executor.max_parallel must be at least 1".to_string(),
        ));
    }
    Ok(())
}
