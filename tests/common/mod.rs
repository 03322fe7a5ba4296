#![allow(dead_code)]

use std::error::Error;

use kern::errors::Result as KernResult;
use kern::exec::Step;
use kern::resource::{ContentHash, ResourceId};
use kern::state::State;
use kern::store::{MemoryBackend, StateStore, Store};

pub use kern_test_utils::{
    Call, RecordingHandler, ResourceBuilder, Workspace, init_tracing, registry_with, with_timeout,
};

pub type TestResult = Result<(), Box<dyn Error>>;

/// Resource kind handled by the recording handler in these tests.
pub const KIND: &str = "Task";

pub fn memory_store() -> StateStore<MemoryBackend> {
    StateStore::new(MemoryBackend::new())
}

/// `action:resource id` for each step.
pub fn labels(steps: &[Step]) -> Vec<String> {
    steps
        .iter()
        .map(|s| format!("{}:{}", s.action, s.resource))
        .collect()
}

/// Memory store that counts how often it is asked to persist.
#[derive(Debug)]
pub struct CountingStore {
    pub inner: StateStore<MemoryBackend>,
    pub saves: usize,
    pub persists: usize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: memory_store(),
            saves: 0,
            persists: 0,
        }
    }
}

impl Store for CountingStore {
    fn get(&mut self, id: &ResourceId, hash: &ContentHash) -> KernResult<State> {
        self.inner.get(id, hash)
    }

    fn save(&mut self, state: &State) -> KernResult<()> {
        self.saves += 1;
        self.inner.save(state)
    }

    fn persist_states(&mut self) -> KernResult<()> {
        self.persists += 1;
        self.inner.persist_states()
    }
}

/// `b` with a source file, `a` depending on `b`.
pub fn two_resource_workspace() -> std::io::Result<Workspace> {
    let ws = Workspace::new()?;
    ws.add_resource("b", &ResourceBuilder::new(KIND, "b"))?;
    ws.write_file("b/src.txt", "b v1")?;
    ws.add_resource("a", &ResourceBuilder::new(KIND, "a").depends_on("Task:b"))?;
    ws.write_file("a/src.txt", "a v1")?;
    Ok(ws)
}
