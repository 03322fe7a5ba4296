// src/exec/mod.rs

//! Plan execution.
//!
//! The orchestrator talks to an [`Executor`]. Two strategies exist:
//!
//! - [`SerialExecutor`]: one node at a time, in dependency order.
//! - [`ParallelExecutor`]: independent nodes run concurrently, bounded by
//!   `max_parallel`.
//!
//! Both run handlers on tokio's blocking pool through [`NodeRunner`] and are
//! the only writers of the states they are given.

pub mod node_runner;
pub mod parallel;
pub mod schedule;
pub mod serial;

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::plan::{DependencyMap, NodeKey, PlanGraph, PlanNode};
use crate::resource::ResourceId;
use crate::state::State;
use crate::types::ExecutorKind;
use crate::errors::Result;

pub use node_runner::NodeRunner;
pub use parallel::ParallelExecutor;
pub use schedule::Schedule;
pub use serial::SerialExecutor;

/// Strategy that traverses a plan graph.
pub trait Executor: Send {
    /// Visit every node once, each after all of its dependencies.
    fn execute<'a>(
        &'a mut self,
        graph: &'a PlanGraph,
        deps: &'a DependencyMap,
        states: &'a mut BTreeMap<ResourceId, State>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Completed nodes, in completion order.
    fn steps(&self) -> &[Step];

    fn name(&self) -> &'static str;
}

/// Record of one executed node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub node: NodeKey,
    pub resource: ResourceId,
    pub action: String,
    pub env: Option<String>,
}

impl Step {
    pub fn from_node(node: &PlanNode) -> Self {
        Self {
            node: node.key.clone(),
            resource: node.resource.id().clone(),
            action: node.action.clone(),
            env: node.env_name.clone(),
        }
    }
}

/// Shared flag checked between node visits.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Executor of the configured kind.
pub fn build_executor(kind: ExecutorKind, runner: NodeRunner, max_parallel: usize) -> Box<dyn Executor> {
    match kind {
        ExecutorKind::Serial => Box::new(SerialExecutor::new(runner)),
        ExecutorKind::Parallel => Box::new(ParallelExecutor::new(runner, max_parallel)),
    }
}
