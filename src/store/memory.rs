// src/store/memory.rs

use std::collections::HashMap;
use std::path::PathBuf;

use crate::errors::{KernError, Result};
use crate::resource::ResourceId;
use crate::state::Artifact;
use crate::store::{StateBackend, StateMap};

/// Keeps persisted states and artifact copies in process; nothing survives
/// the run.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    states: HashMap<ResourceId, StateMap>,
    artifacts: HashMap<(ResourceId, PathBuf), Vec<u8>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// States persisted so far for `id`.
    pub fn persisted(&self, id: &ResourceId) -> Option<&StateMap> {
        self.states.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of archived artifact copies.
    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }
}

impl StateBackend for MemoryBackend {
    fn load(&self, id: &ResourceId) -> Result<StateMap> {
        Ok(self.states.get(id).cloned().unwrap_or_default())
    }

    fn write(&mut self, id: &ResourceId, states: &StateMap) -> Result<()> {
        self.states.insert(id.clone(), states.clone());
        Ok(())
    }

    fn store_artifact(&mut self, id: &ResourceId, artifact: &Artifact, contents: &[u8]) -> Result<()> {
        self.artifacts
            .insert((id.clone(), artifact.archive_key()), contents.to_vec());
        Ok(())
    }

    fn read_artifact(&self, id: &ResourceId, artifact: &Artifact) -> Result<Vec<u8>> {
        self.artifacts
            .get(&(id.clone(), artifact.archive_key()))
            .cloned()
            .ok_or_else(|| KernError::Store(format!("no archived copy of {} for {id}", artifact.id)))
    }
}
