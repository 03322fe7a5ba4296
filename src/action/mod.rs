// src/action/mod.rs

//! Action dispatch.
//!
//! An [`ActionRegistry`] is built once per process and passed explicitly to
//! the orchestrator. It knows the ordered action lifecycle (`build`, `test`,
//! `publish`, `deploy` by default) and which [`ActionHandler`] performs
//! actions for each resource kind.

pub mod context;
pub mod env;
pub mod shell;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{KernError, Result};
use crate::resource::{ENV_KIND, Resource};
use crate::state::{ActionResult, StateSnapshot};

pub use context::ActionContext;
pub use env::EnvHandler;
pub use shell::{SHELL_KIND, ShellHandler};

/// The default lifecycle, in order.
pub const DEFAULT_ACTIONS: [&str; 4] = ["build", "test", "publish", "deploy"];

/// Performs actions for one resource kind.
///
/// `run` is called on the blocking thread pool, so implementations may block.
pub trait ActionHandler: Send + Sync {
    fn run(&self, ctx: &ActionContext) -> anyhow::Result<ActionResult>;

    /// Ask for `action` to run even though nothing changed.
    fn force_rerun(
        &self,
        _action: &str,
        _resource: &Resource,
        _prior: &StateSnapshot,
        _env: Option<&str>,
    ) -> bool {
        false
    }
}

/// Ordered lifecycle plus the handler for each resource kind.
#[derive(Clone)]
pub struct ActionRegistry {
    actions: Vec<String>,
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&String> = self.handlers.keys().collect();
        kinds.sort();
        f.debug_struct("ActionRegistry")
            .field("actions", &self.actions)
            .field("kinds", &kinds)
            .finish()
    }
}

impl ActionRegistry {
    /// Registry with the given lifecycle and no handlers.
    pub fn new<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            actions: actions.into_iter().map(Into::into).collect(),
            handlers: HashMap::new(),
        }
    }

    /// Default lifecycle with the built-in `Env` and `Shell` handlers.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_ACTIONS)
            .with_handler(ENV_KIND, Arc::new(EnvHandler))
            .with_handler(SHELL_KIND, Arc::new(ShellHandler::new()))
    }

    pub fn register(&mut self, kind: impl Into<String>, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(kind.into(), handler);
    }

    pub fn with_handler(mut self, kind: impl Into<String>, handler: Arc<dyn ActionHandler>) -> Self {
        self.register(kind, handler);
        self
    }

    /// Every known action, in lifecycle order.
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn is_known(&self, action: &str) -> bool {
        self.order_of(action).is_some()
    }

    /// Position of `action` in the lifecycle.
    pub fn order_of(&self, action: &str) -> Option<usize> {
        self.actions.iter().position(|a| a == action)
    }

    pub fn ensure_known(&self, action: &str) -> Result<()> {
        if self.is_known(action) {
            Ok(())
        } else {
            Err(KernError::UnknownAction {
                action: action.to_string(),
                known: self.actions.clone(),
            })
        }
    }

    /// Lifecycle prefix ending with `action` (inclusive).
    pub fn lifecycle_through(&self, action: &str) -> Result<&[String]> {
        self.ensure_known(action)?;
        let end = self.order_of(action).map(|i| i + 1).unwrap_or(0);
        Ok(&self.actions[..end])
    }

    /// `true` when `action` comes at or after `other` in the lifecycle.
    pub fn is_at_or_after(&self, action: &str, other: &str) -> bool {
        match (self.order_of(action), self.order_of(other)) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        }
    }

    pub fn handler(&self, kind: &str) -> Result<Arc<dyn ActionHandler>> {
        self.handlers
            .get(kind)
            .cloned()
            .ok_or_else(|| KernError::NoHandler(kind.to_string()))
    }

    pub fn has_handler(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
