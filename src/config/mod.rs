// src/config/mod.rs

//! `Kern.toml` configuration.
//!
//! - `model.rs`: raw TOML model and the validated [`KernConfig`].
//! - `loader.rs`: reading from disk, default location.
//! - `validate.rs`: semantic checks, `TryFrom<RawKernConfig>`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{ExecutorSection, KernConfig, RawKernConfig, StoreSection};
pub use validate::validate_config;
