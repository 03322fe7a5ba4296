// src/state/mod.rs

//! Per-resource execution state.
//!
//! A [`State`] is keyed by `(resource id, content hash)` and records, per
//! action and per environment, what the last successful execution produced.
//! The planner reads an immutable [`StateSnapshot`] of it; the executor is the
//! only writer.

pub mod artifact;

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{KernError, Result};
use crate::resource::{ContentHash, ResourceId};

pub use artifact::{Artifact, FILE_KIND};

/// What one action produced in one environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub outputs: BTreeMap<String, serde_json::Value>,
}

impl ActionResult {
    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }
}

/// Last action that succeeded and last action that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub last_action: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Serialisable body of a [`State`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateData {
    pub hash: ContentHash,
    pub resource_id: ResourceId,
    #[serde(default)]
    pub envs: BTreeMap<String, BTreeMap<String, ActionResult>>,
    #[serde(default)]
    pub no_env: BTreeMap<String, ActionResult>,
    /// Dependency id -> content hash it had when this resource last ran.
    #[serde(default)]
    pub deps: BTreeMap<ResourceId, ContentHash>,
    #[serde(default)]
    pub status: Status,
}

impl StateData {
    pub fn result(&self, action: &str, env: Option<&str>) -> Option<&ActionResult> {
        match env {
            None => self.no_env.get(action),
            Some(env) => self.envs.get(env).and_then(|actions| actions.get(action)),
        }
    }

    pub fn has_result(&self, action: &str, env: Option<&str>) -> bool {
        self.result(action, env).is_some()
    }

    /// Artifacts recorded for one action/environment pair.
    pub fn artifacts(&self, action: &str, env: Option<&str>) -> &[Artifact] {
        self.result(action, env)
            .map(|r| r.artifacts.as_slice())
            .unwrap_or(&[])
    }

    pub fn dep(&self, id: &ResourceId) -> Option<&ContentHash> {
        self.deps.get(id)
    }

    /// Environments in which `action` has a recorded result.
    pub fn env_names(&self, action: &str) -> Vec<&str> {
        self.envs
            .iter()
            .filter(|(_, actions)| actions.contains_key(action))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.status.error.as_deref()
    }

    pub fn last_action(&self) -> Option<&str> {
        self.status.last_action.as_deref()
    }
}

/// Read-only snapshot of a state (the planner's view).
///
/// Cheap to clone; later writes to the originating [`State`] are not visible.
#[derive(Debug, Clone)]
pub struct StateSnapshot(Arc<StateData>);

impl StateSnapshot {
    /// Snapshot of a state that has never run anything.
    pub fn empty(resource_id: ResourceId, hash: ContentHash) -> Self {
        State::new(resource_id, hash).snapshot()
    }
}

impl Deref for StateSnapshot {
    type Target = StateData;

    fn deref(&self) -> &StateData {
        &self.0
    }
}

/// Mutable record for one `(resource id, content hash)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    data: StateData,
}

impl State {
    pub fn new(resource_id: ResourceId, hash: ContentHash) -> Self {
        Self {
            data: StateData {
                hash,
                resource_id,
                envs: BTreeMap::new(),
                no_env: BTreeMap::new(),
                deps: BTreeMap::new(),
                status: Status::default(),
            },
        }
    }

    pub fn from_data(data: StateData) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &StateData {
        &self.data
    }

    pub fn hash(&self) -> &ContentHash {
        &self.data.hash
    }

    pub fn resource_id(&self) -> &ResourceId {
        &self.data.resource_id
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot(Arc::new(self.data.clone()))
    }

    /// Record the result of running `action` in `env`.
    ///
    /// Every artifact must be tagged with the same action and env.
    pub fn set_result(&mut self, action: &str, env: Option<&str>, result: ActionResult) -> Result<()> {
        for artifact in &result.artifacts {
            if artifact.action != action {
                return Err(KernError::StateArtifact(format!(
                    "Found artifact for action {} in {} result",
                    artifact.action, action
                )));
            }
            if artifact.env.as_deref() != env {
                return Err(KernError::StateArtifact(format!(
                    "Found artifact for env {:?} in {} result of env {:?}",
                    artifact.env, action, env
                )));
            }
        }

        match env {
            None => {
                self.data.no_env.insert(action.to_string(), result);
            }
            Some(env) => {
                self.data
                    .envs
                    .entry(env.to_string())
                    .or_default()
                    .insert(action.to_string(), result);
            }
        }
        Ok(())
    }

    pub fn result(&self, action: &str, env: Option<&str>) -> Option<&ActionResult> {
        self.data.result(action, env)
    }

    pub fn artifacts(&self, action: &str, env: Option<&str>) -> &[Artifact] {
        self.data.artifacts(action, env)
    }

    pub fn env_names(&self, action: &str) -> Vec<&str> {
        self.data.env_names(action)
    }

    pub fn add_dep(&mut self, id: ResourceId, hash: ContentHash) {
        self.data.deps.insert(id, hash);
    }

    pub fn deps(&self) -> &BTreeMap<ResourceId, ContentHash> {
        &self.data.deps
    }

    pub fn set_status(&mut self, last_action: Option<String>, error: Option<String>) {
        self.data.status = Status { last_action, error };
    }

    pub fn status(&self) -> &Status {
        &self.data.status
    }

    pub fn mark_succeeded(&mut self, action: &str) {
        self.set_status(Some(action.to_string()), None);
    }

    /// Keep the last successful action, flag `action` as failed.
    pub fn mark_failed(&mut self, action: &str) {
        let last = self.data.status.last_action.clone();
        self.set_status(last, Some(action.to_string()));
    }

    /// All recorded results: `(action, env, result)`.
    pub fn results(&self) -> impl Iterator<Item = (&str, Option<&str>, &ActionResult)> {
        let no_env = self
            .data
            .no_env
            .iter()
            .map(|(action, result)| (action.as_str(), None, result));
        let envs = self.data.envs.iter().flat_map(|(env, actions)| {
            actions
                .iter()
                .map(move |(action, result)| (action.as_str(), Some(env.as_str()), result))
        });
        no_env.chain(envs)
    }
}
