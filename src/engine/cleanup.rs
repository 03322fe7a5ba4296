// src/engine/cleanup.rs

//! The finalizer of the execution branch: persist every state, then sweep
//! transient file artifacts.

use std::collections::BTreeMap;

use tracing::{debug, error};

use crate::action::ActionRegistry;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::resource::ResourceId;
use crate::state::State;
use crate::store::Store;

/// Stage and persist `states`, then remove their `file` artifacts.
///
/// The sweep runs even when persisting fails; its own errors are swallowed.
pub fn finalize(
    store: &mut dyn Store,
    fs: &dyn FileSystem,
    states: &BTreeMap<ResourceId, State>,
    registry: &ActionRegistry,
) -> Result<()> {
    let persisted = persist(store, states);
    if let Err(err) = &persisted {
        error!(error = %err, "failed to persist states");
    }
    let removed = sweep_file_artifacts(fs, states, registry);
    debug!(removed, "artifact sweep finished");
    persisted
}

fn persist(store: &mut dyn Store, states: &BTreeMap<ResourceId, State>) -> Result<()> {
    for state in states.values() {
        store.save(state)?;
    }
    store.persist_states()
}

/// Remove every recorded `file` artifact of the tracked states, for every
/// known action and environment. Returns how many files were removed.
///
/// Covers states the planner only consulted too, since reusing a stored
/// state restores its archived files into the workspace.
pub fn sweep_file_artifacts(
    fs: &dyn FileSystem,
    states: &BTreeMap<ResourceId, State>,
    registry: &ActionRegistry,
) -> usize {
    let mut removed = 0;
    for (id, state) in states {
        for (action, _, result) in state.results() {
            if !registry.is_known(action) {
                continue;
            }
            for path in result.artifacts.iter().filter_map(|a| a.path()) {
                match fs.remove_file(&path) {
                    Ok(()) => {
                        debug!(resource = %id, path = %path.display(), "removed file artifact");
                        removed += 1;
                    }
                    Err(err) => {
                        debug!(resource = %id, path = %path.display(), error = %err, "could not remove file artifact");
                    }
                }
            }
        }
    }
    removed
}
