// src/exec/serial.rs

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::errors::Result;
use crate::exec::node_runner::NodeRunner;
use crate::exec::schedule::Schedule;
use crate::exec::{Executor, Step};
use crate::plan::{DependencyMap, PlanGraph};
use crate::resource::ResourceId;
use crate::state::State;

/// Runs one node at a time; among ready nodes the smallest key goes first.
#[derive(Debug)]
pub struct SerialExecutor {
    runner: NodeRunner,
    steps: Vec<Step>,
}

impl SerialExecutor {
    pub fn new(runner: NodeRunner) -> Self {
        Self {
            runner,
            steps: Vec::new(),
        }
    }
}

impl Executor for SerialExecutor {
    fn execute<'a>(
        &'a mut self,
        graph: &'a PlanGraph,
        deps: &'a DependencyMap,
        states: &'a mut BTreeMap<ResourceId, State>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut schedule = Schedule::new(deps);

            while let Some(key) = schedule.pop_ready() {
                self.runner.check_cancelled()?;

                let prepared = self.runner.prepare(graph, &key, states)?;
                let (key, outcome) = NodeRunner::run(prepared).await;
                let step = self.runner.apply(graph, &key, outcome, states)?;

                self.steps.push(step);
                schedule.complete(&key);
            }

            schedule.ensure_drained()?;
            debug!(steps = self.steps.len(), "serial execution finished");
            Ok(())
        })
    }

    fn steps(&self) -> &[Step] {
        &self.steps
    }

    fn name(&self) -> &'static str {
        "SerialExecutor"
    }
}
