// src/exec/schedule.rs

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::errors::{KernError, Result};
use crate::plan::{DependencyMap, NodeKey};

/// Kahn-style bookkeeping over a [`DependencyMap`].
///
/// Ready nodes come out in key order, so a serial traversal is
/// deterministic.
#[derive(Debug)]
pub struct Schedule {
    pending: BTreeMap<NodeKey, usize>,
    dependents: BTreeMap<NodeKey, Vec<NodeKey>>,
    ready: BTreeSet<NodeKey>,
    completed: usize,
    total: usize,
}

impl Schedule {
    pub fn new(deps: &DependencyMap) -> Self {
        let mut pending = BTreeMap::new();
        let mut dependents: BTreeMap<NodeKey, Vec<NodeKey>> = BTreeMap::new();
        let mut ready = BTreeSet::new();

        for (key, prereqs) in deps {
            if prereqs.is_empty() {
                ready.insert(key.clone());
            } else {
                pending.insert(key.clone(), prereqs.len());
            }
            for prereq in prereqs {
                dependents.entry(prereq.clone()).or_default().push(key.clone());
            }
        }

        Self {
            pending,
            dependents,
            ready,
            completed: 0,
            total: deps.len(),
        }
    }

    /// Next node whose prerequisites have all completed.
    pub fn pop_ready(&mut self) -> Option<NodeKey> {
        self.ready.pop_first()
    }

    pub fn has_ready(&self) -> bool {
        !self.ready.is_empty()
    }

    /// Mark `key` completed, releasing its dependents.
    pub fn complete(&mut self, key: &NodeKey) {
        self.completed += 1;
        let Some(dependents) = self.dependents.get(key) else {
            return;
        };
        for dependent in dependents {
            if let Some(count) = self.pending.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    self.pending.remove(dependent);
                    debug!(node = %dependent, "node ready");
                    self.ready.insert(dependent.clone());
                }
            }
        }
    }

    pub fn is_done(&self) -> bool {
        self.completed == self.total
    }

    /// Error out when nodes are left that can never become ready.
    pub fn ensure_drained(&self) -> Result<()> {
        if self.is_done() {
            return Ok(());
        }
        let stuck: Vec<&str> = self.pending.keys().map(NodeKey::as_str).collect();
        Err(KernError::DagCycle(format!(
            "{} node(s) never became ready: {}",
            stuck.len(),
            stuck.join(", ")
        )))
    }
}
