// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::{ExecutorKind, StoreKind};

/// `Kern.toml` as read from disk, before validation.
///
/// ```toml
/// [store]
/// kind = "file"
/// output = ".kern/store"
/// organization = "local"
/// project = "default"
///
/// [executor]
/// kind = "serial"
/// max_parallel = 4
/// ```
///
/// Every section is optional.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawKernConfig {
    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub executor: ExecutorSection,
}

/// `[store]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    #[serde(default)]
    pub kind: StoreKind,

    /// Output directory of the file store, relative to the base path.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    #[serde(default = "default_organization")]
    pub organization: String,

    #[serde(default = "default_project")]
    pub project: String,
}

fn default_output() -> PathBuf {
    PathBuf::from(".kern/store")
}

fn default_organization() -> String {
    "local".to_string()
}

fn default_project() -> String {
    "default".to_string()
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            output: default_output(),
            organization: default_organization(),
            project: default_project(),
        }
    }
}

/// `[executor]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorSection {
    #[serde(default)]
    pub kind: ExecutorKind,

    /// Upper bound on concurrently running actions (parallel executor only).
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
}

fn default_max_parallel() -> usize {
    4
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            kind: ExecutorKind::default(),
            max_parallel: default_max_parallel(),
        }
    }
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawKernConfig>` (see `validate.rs`) or
/// [`KernConfig::default`].
#[derive(Debug, Clone)]
pub struct KernConfig {
    store: StoreSection,
    executor: ExecutorSection,
}

impl KernConfig {
    pub(crate) fn new_unchecked(store: StoreSection, executor: ExecutorSection) -> Self {
        Self { store, executor }
    }

    pub fn store(&self) -> &StoreSection {
        &self.store
    }

    pub fn executor(&self) -> &ExecutorSection {
        &self.executor
    }

    /// Store output directory resolved against `base`.
    pub fn store_root(&self, base: &Path) -> PathBuf {
        if self.store.output.is_absolute() {
            self.store.output.clone()
        } else {
            base.join(&self.store.output)
        }
    }

    pub fn with_executor(mut self, kind: ExecutorKind) -> Self {
        self.executor.kind = kind;
        self
    }

    pub fn with_store_kind(mut self, kind: StoreKind) -> Self {
        self.store.kind = kind;
        self
    }
}

impl Default for KernConfig {
    fn default() -> Self {
        Self::new_unchecked(StoreSection::default(), ExecutorSection::default())
    }
}
