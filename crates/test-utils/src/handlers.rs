#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::bail;
use kern::action::{ActionContext, ActionHandler, ActionRegistry, DEFAULT_ACTIONS, EnvHandler};
use kern::state::ActionResult;

/// One recorded handler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub resource: String,
    pub action: String,
    pub env: Option<String>,
}

impl Call {
    /// `action:resource`, e.g. `build:Task:a`.
    pub fn label(&self) -> String {
        format!("{}:{}", self.action, self.resource)
    }
}

/// Handler that records calls instead of doing work.
///
/// - optionally writes `<name>-<action>.out` in the resource directory and
///   records it as a `file` artifact;
/// - fails or panics for configured `(resource id, action)` pairs;
/// - tracks the highest number of concurrent calls.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    calls: Arc<Mutex<Vec<Call>>>,
    fail_on: Arc<Mutex<HashSet<(String, String)>>>,
    panic_on: Arc<Mutex<HashSet<(String, String)>>>,
    file_artifacts: bool,
    delay: Option<Duration>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file_artifacts(mut self) -> Self {
        self.file_artifacts = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_on(&self, resource: &str, action: &str) {
        self.fail_on
            .lock()
            .unwrap()
            .insert((resource.to_string(), action.to_string()));
    }

    pub fn panic_on(&self, resource: &str, action: &str) {
        self.panic_on
            .lock()
            .unwrap()
            .insert((resource.to_string(), action.to_string()));
    }

    pub fn clear_failures(&self) {
        self.fail_on.lock().unwrap().clear();
        self.panic_on.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Call labels in invocation order.
    pub fn labels(&self) -> Vec<String> {
        self.calls().iter().map(Call::label).collect()
    }

    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl ActionHandler for RecordingHandler {
    fn run(&self, ctx: &ActionContext) -> anyhow::Result<ActionResult> {
        let key = (ctx.resource.id().to_string(), ctx.action.clone());
        self.calls.lock().unwrap().push(Call {
            resource: key.0.clone(),
            action: key.1.clone(),
            env: ctx.env_name.clone(),
        });

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.panic_on.lock().unwrap().contains(&key) {
            panic!("injected panic in {} {}", key.1, key.0);
        }
        if self.fail_on.lock().unwrap().contains(&key) {
            bail!("injected failure in {} {}", key.1, key.0);
        }

        let mut result = ActionResult::default().with_output("action", ctx.action.as_str());
        if self.file_artifacts {
            let name = format!("{}-{}.out", ctx.resource.name(), ctx.action);
            let path = ctx.resource_dir().join(&name);
            std::fs::write(&path, ctx.hash.as_str())?;
            result = result.with_artifact(ctx.file_artifact(name, &path));
        }
        Ok(result)
    }
}

/// Default lifecycle, `Env` handled by [`EnvHandler`], `kind` by `handler`.
pub fn registry_with(kind: &str, handler: &RecordingHandler) -> ActionRegistry {
    ActionRegistry::new(DEFAULT_ACTIONS)
        .with_handler("Env", Arc::new(EnvHandler))
        .with_handler(kind, Arc::new(handler.clone()))
}
