// src/store/mod.rs

//! Durable memory of past executions, keyed by `(resource id, content hash)`.
//!
//! The [`Store`] trait is what the orchestrator and planner talk to.
//! [`StateStore`] implements it on top of a [`StateBackend`]: states handed to
//! [`Store::save`] are staged in memory and only written out by
//! [`Store::persist_states`], together with a copy of every `file` artifact
//! they record. Reusing a stored state puts those files back in place.

pub mod file;
pub mod memory;

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::KernConfig;
use crate::errors::{KernError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::resource::{ContentHash, ResourceId};
use crate::state::{Artifact, State, StateData};
use crate::types::StoreKind;

pub use file::FileBackend;
pub use memory::MemoryBackend;

/// All known states of one resource, by content hash.
pub type StateMap = BTreeMap<ContentHash, StateData>;

/// State store seen by the orchestrator and planner.
pub trait Store: Send {
    /// State for this exact `(id, hash)` pair, or a fresh empty one.
    fn get(&mut self, id: &ResourceId, hash: &ContentHash) -> Result<State>;

    /// Stage a state for the next [`Store::persist_states`].
    fn save(&mut self, state: &State) -> Result<()>;

    /// Make every staged state durable.
    fn persist_states(&mut self) -> Result<()>;
}

/// Where persisted states live.
pub trait StateBackend: Send {
    /// Every state ever persisted for `id` (empty when none).
    fn load(&self, id: &ResourceId) -> Result<StateMap>;

    /// Replace the persisted states of `id`.
    fn write(&mut self, id: &ResourceId, states: &StateMap) -> Result<()>;

    /// Keep a copy of the contents of a `file` artifact of `id`.
    fn store_artifact(&mut self, id: &ResourceId, artifact: &Artifact, contents: &[u8]) -> Result<()>;

    /// Contents kept by [`StateBackend::store_artifact`].
    fn read_artifact(&self, id: &ResourceId, artifact: &Artifact) -> Result<Vec<u8>>;
}

/// [`Store`] staging states in memory over a [`StateBackend`].
///
/// Artifact files are read and restored through a [`FileSystem`], the real
/// one unless [`StateStore::with_fs`] says otherwise.
#[derive(Debug)]
pub struct StateStore<B> {
    backend: B,
    fs: Arc<dyn FileSystem>,
    staged: HashMap<ResourceId, BTreeMap<ContentHash, State>>,
}

impl<B: StateBackend> StateStore<B> {
    pub fn new(backend: B) -> Self {
        Self::with_fs(backend, Arc::new(RealFileSystem))
    }

    pub fn with_fs(backend: B, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            backend,
            fs,
            staged: HashMap::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Number of states waiting for [`Store::persist_states`].
    pub fn staged_len(&self) -> usize {
        self.staged.values().map(BTreeMap::len).sum()
    }

    /// Copy every `file` artifact of `state` that is present on disk into
    /// the backend. Files already gone keep their earlier copy.
    fn archive_artifacts(&mut self, state: &State) -> Result<()> {
        let id = state.resource_id();
        for artifact in file_artifacts(state) {
            let Some(path) = artifact.path() else {
                continue;
            };
            let mut contents = Vec::new();
            let read = self
                .fs
                .open_read(&path)
                .and_then(|mut file| Ok(file.read_to_end(&mut contents)?));
            if let Err(err) = read {
                debug!(resource = %id, path = %path.display(), error = %err, "artifact not on disk, not archived");
                continue;
            }
            self.backend.store_artifact(id, artifact, &contents)?;
            debug!(resource = %id, path = %path.display(), bytes = contents.len(), "archived file artifact");
        }
        Ok(())
    }

    /// Write the archived `file` artifacts of `state` back to their paths.
    fn restore_artifacts(&self, state: &State) -> Result<()> {
        let id = state.resource_id();
        for artifact in file_artifacts(state) {
            let Some(path) = artifact.path() else {
                continue;
            };
            let contents = self.backend.read_artifact(id, artifact)?;
            self.fs
                .write(&path, &contents)
                .map_err(|e| KernError::Store(format!("restoring {}: {e:#}", path.display())))?;
            debug!(resource = %id, path = %path.display(), "restored file artifact");
        }
        Ok(())
    }
}

fn file_artifacts(state: &State) -> impl Iterator<Item = &Artifact> {
    state
        .results()
        .flat_map(|(_, _, result)| result.artifacts.iter())
        .filter(|a| a.is_file())
}

impl<B: StateBackend> Store for StateStore<B> {
    fn get(&mut self, id: &ResourceId, hash: &ContentHash) -> Result<State> {
        if let Some(state) = self.staged.get(id).and_then(|states| states.get(hash)) {
            return Ok(state.clone());
        }

        let mut persisted = self.backend.load(id)?;
        let Some(data) = persisted.remove(hash) else {
            debug!(resource = %id, hash = hash.short(), "no stored state for hash");
            return Ok(State::new(id.clone(), hash.clone()));
        };

        let state = State::from_data(data);
        if let Err(err) = self.restore_artifacts(&state) {
            warn!(resource = %id, hash = hash.short(), error = %err, "stored artifacts unavailable, discarding stored state");
            return Ok(State::new(id.clone(), hash.clone()));
        }
        debug!(resource = %id, hash = hash.short(), "reusing stored state");
        Ok(state)
    }

    fn save(&mut self, state: &State) -> Result<()> {
        self.staged
            .entry(state.resource_id().clone())
            .or_default()
            .insert(state.hash().clone(), state.clone());
        Ok(())
    }

    /// Write every staged state, archiving its file artifacts first.
    ///
    /// All states are written even when archiving one fails; the first
    /// failure is returned afterwards.
    fn persist_states(&mut self) -> Result<()> {
        let count = self.staged_len();
        let staged = std::mem::take(&mut self.staged);
        let mut first_error = None;

        for (id, states) in &staged {
            for state in states.values() {
                if let Err(err) = self.archive_artifacts(state) {
                    warn!(resource = %id, error = %err, "failed to archive artifacts");
                    first_error.get_or_insert(err);
                }
            }
            let mut persisted = self.backend.load(id)?;
            for (hash, state) in states {
                persisted.insert(hash.clone(), state.data().clone());
            }
            self.backend.write(id, &persisted)?;
        }
        info!(states = count, "persisted states");
        first_error.map_or(Ok(()), Err)
    }
}

/// Build the store selected by `[store]` in `Kern.toml`.
pub fn open_store(config: &KernConfig, base: &Path) -> Box<dyn Store> {
    let store = config.store();
    match store.kind {
        StoreKind::File => {
            let root = config
                .store_root(base)
                .join(&store.organization)
                .join(&store.project);
            debug!(root = %root.display(), "using file store");
            Box::new(StateStore::new(FileBackend::new(root)))
        }
        StoreKind::Memory => {
            debug!("using in-memory store");
            Box::new(StateStore::new(MemoryBackend::default()))
        }
    }
}
