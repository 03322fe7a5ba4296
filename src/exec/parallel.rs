// src/exec/parallel.rs

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::errors::{KernError, Result};
use crate::exec::node_runner::NodeRunner;
use crate::exec::schedule::Schedule;
use crate::exec::{Executor, Step};
use crate::plan::{DependencyMap, NodeKey, PlanGraph};
use crate::resource::ResourceId;
use crate::state::{ActionResult, State};

/// Runs up to `max_parallel` ready nodes at once.
///
/// Handlers run concurrently; their outcomes are applied to the states by
/// this executor only, one at a time. After the first failure nothing new
/// is started, in-flight nodes are awaited and recorded, and the first error
/// is returned.
#[derive(Debug)]
pub struct ParallelExecutor {
    runner: NodeRunner,
    max_parallel: usize,
    steps: Vec<Step>,
}

impl ParallelExecutor {
    pub fn new(runner: NodeRunner, max_parallel: usize) -> Self {
        Self {
            runner,
            max_parallel: max_parallel.max(1),
            steps: Vec::new(),
        }
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }
}

impl Executor for ParallelExecutor {
    fn execute<'a>(
        &'a mut self,
        graph: &'a PlanGraph,
        deps: &'a DependencyMap,
        states: &'a mut BTreeMap<ResourceId, State>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut schedule = Schedule::new(deps);
            let mut in_flight: JoinSet<(NodeKey, Result<ActionResult>)> = JoinSet::new();
            let mut first_error: Option<KernError> = None;

            loop {
                while first_error.is_none() && in_flight.len() < self.max_parallel {
                    let Some(key) = schedule.pop_ready() else {
                        break;
                    };
                    let started = self
                        .runner
                        .check_cancelled()
                        .and_then(|()| self.runner.prepare(graph, &key, states));
                    match started {
                        Ok(prepared) => {
                            debug!(node = %key, in_flight = in_flight.len() + 1, "dispatching node");
                            in_flight.spawn(NodeRunner::run(prepared));
                        }
                        Err(err) => first_error = Some(err),
                    }
                }

                let Some(joined) = in_flight.join_next().await else {
                    break;
                };
                let (key, outcome) = match joined {
                    Ok(done) => done,
                    Err(join_err) => {
                        // `NodeRunner::run` catches handler panics itself.
                        warn!(error = %join_err, "executor task aborted");
                        first_error.get_or_insert(KernError::ActionPanicked {
                            node: "<unknown>".to_string(),
                            message: join_err.to_string(),
                        });
                        continue;
                    }
                };

                match self.runner.apply(graph, &key, outcome, states) {
                    Ok(step) => {
                        self.steps.push(step);
                        schedule.complete(&key);
                    }
                    Err(err) => {
                        if first_error.is_some() {
                            warn!(node = %key, error = %err, "further failure after first error");
                        } else {
                            first_error = Some(err);
                        }
                    }
                }
            }

            if let Some(err) = first_error {
                return Err(err);
            }
            schedule.ensure_drained()?;
            debug!(steps = self.steps.len(), "parallel execution finished");
            Ok(())
        })
    }

    fn steps(&self) -> &[Step] {
        &self.steps
    }

    fn name(&self) -> &'static str {
        "ParallelExecutor"
    }
}
