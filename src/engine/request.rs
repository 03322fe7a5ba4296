// src/engine/request.rs

use std::path::{Path, PathBuf};

use crate::types::ExecutorKind;

/// One top-level `(resource, action, env)` request.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    /// Declaration file, or a directory holding `resource.toml`.
    pub resource_file: PathBuf,
    pub action: String,
    pub env: Option<String>,
    /// Root of the resource space; defaults to the declaration's directory.
    pub base_path: Option<PathBuf>,
    /// When set, write the plan diagram here instead of executing.
    pub plan_file: Option<PathBuf>,
    pub executor: ExecutorKind,
    pub max_parallel: usize,
}

impl ActionRequest {
    pub fn new(resource_file: impl Into<PathBuf>, action: impl Into<String>) -> Self {
        Self {
            resource_file: resource_file.into(),
            action: action.into(),
            env: None,
            base_path: None,
            plan_file: None,
            executor: ExecutorKind::default(),
            max_parallel: 4,
        }
    }

    pub fn with_env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    pub fn with_base_path(mut self, base: impl Into<PathBuf>) -> Self {
        self.base_path = Some(base.into());
        self
    }

    pub fn with_plan_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.plan_file = Some(path.into());
        self
    }

    pub fn with_executor(mut self, kind: ExecutorKind) -> Self {
        self.executor = kind;
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    /// Base path given a resolved declaration file.
    pub fn base_for(&self, declaration: &Path) -> PathBuf {
        if let Some(base) = &self.base_path {
            return base.clone();
        }
        match declaration.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}
