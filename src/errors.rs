// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KernError {
    /// Resource file missing or unrecognised, or a required resource
    /// (typically `Env:<name>`) could not be found.
    #[error("Resource error: {0}")]
    Resource(String),

    #[error("Resource config error: {0}")]
    ResourceConfig(String),

    #[error("Resource spec error: {0}")]
    ResourceSpec(String),

    #[error("State error: {0}")]
    State(String),

    #[error("State artifact error: {0}")]
    StateArtifact(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported action: {action} (expected one of {known:?})")]
    UnknownAction { action: String, known: Vec<String> },

    #[error("No action handler registered for resource kind '{0}'")]
    NoHandler(String),

    #[error("Action failed for node {node}")]
    ActionFailed {
        node: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Action panicked for node {node}: {message}")]
    ActionPanicked { node: String, message: String },

    #[error("Execution cancelled")]
    Cancelled,

    #[error("Cycle detected in plan: {0}")]
    DagCycle(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KernError {
    /// `true` for the early, user-facing resource lookup failures.
    pub fn is_resource_error(&self) -> bool {
        matches!(self, KernError::Resource(_))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, KernError>;
