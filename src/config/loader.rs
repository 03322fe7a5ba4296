// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{KernConfig, RawKernConfig};
use crate::errors::Result;

/// Read and deserialize a `Kern.toml`, without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawKernConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawKernConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Read, deserialize and validate a `Kern.toml`.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<KernConfig> {
    let raw_config = load_from_path(&path)?;
    let config = KernConfig::try_from(raw_config)?;
    Ok(config)
}

/// `Kern.toml` next to the base path.
pub fn default_config_path(base: &Path) -> PathBuf {
    base.join("Kern.toml")
}

/// Load an explicitly given config, else the default one if present, else
/// built-in defaults.
///
/// An explicit path that does not exist is an error.
pub fn load_or_default(explicit: Option<&Path>, base: &Path) -> Result<KernConfig> {
    if let Some(path) = explicit {
        return load_and_validate(path);
    }

    let path = default_config_path(base);
    if path.is_file() {
        debug!(config = %path.display(), "loading configuration");
        load_and_validate(&path)
    } else {
        debug!("no Kern.toml found, using defaults");
        Ok(KernConfig::default())
    }
}
