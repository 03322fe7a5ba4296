// src/exec/node_runner.rs

//! Shared per-node logic of the executors: build the action context, run the
//! handler on the blocking pool, apply the outcome to the node's state.

use std::any::Any;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};

use crate::action::{ActionContext, ActionHandler, ActionRegistry};
use crate::errors::{KernError, Result};
use crate::exec::{CancelFlag, Step};
use crate::plan::{NodeKey, PlanGraph, PlanNode};
use crate::resource::{Resource, ResourceId, SpecRef};
use crate::state::{ActionResult, State};

/// A node ready to go to the blocking pool.
pub struct PreparedNode {
    pub key: NodeKey,
    pub handler: Arc<dyn ActionHandler>,
    pub ctx: ActionContext,
}

#[derive(Debug, Clone)]
pub struct NodeRunner {
    registry: ActionRegistry,
    base: PathBuf,
    cancel: CancelFlag,
}

impl NodeRunner {
    pub fn new(registry: ActionRegistry, base: impl Into<PathBuf>, cancel: CancelFlag) -> Self {
        Self {
            registry,
            base: base.into(),
            cancel,
        }
    }

    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(KernError::Cancelled);
        }
        Ok(())
    }

    pub fn prepare(
        &self,
        graph: &PlanGraph,
        key: &NodeKey,
        states: &BTreeMap<ResourceId, State>,
    ) -> Result<PreparedNode> {
        let node = lookup(graph, key)?;
        let state = states.get(node.resource.id()).ok_or_else(|| {
            KernError::State(format!("no state tracked for {}", node.resource.id()))
        })?;
        let handler = self.registry.handler(node.resource.kind())?;
        let resource = resolve_spec(node, states)?;
        info!(node = %key, reason = %node.reason, "running action");

        Ok(PreparedNode {
            key: key.clone(),
            handler,
            ctx: ActionContext {
                action: node.action.clone(),
                resource,
                env: node.env.clone(),
                env_name: node.env_name.clone(),
                hash: node.hash.clone(),
                prior: state.snapshot(),
                base: self.base.clone(),
            },
        })
    }

    /// Run the handler; a panic becomes [`KernError::ActionPanicked`].
    pub async fn run(prepared: PreparedNode) -> (NodeKey, Result<ActionResult>) {
        let PreparedNode { key, handler, ctx } = prepared;

        let joined = tokio::task::spawn_blocking(move || handler.run(&ctx)).await;
        let outcome = match joined {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(err)) => Err(KernError::ActionFailed {
                node: key.to_string(),
                source: err.into(),
            }),
            Err(join_err) => {
                let message = if join_err.is_panic() {
                    panic_message(join_err.into_panic())
                } else {
                    "action task was cancelled".to_string()
                };
                Err(KernError::ActionPanicked {
                    node: key.to_string(),
                    message,
                })
            }
        };
        (key, outcome)
    }

    /// Record the outcome into the node's state.
    pub fn apply(
        &self,
        graph: &PlanGraph,
        key: &NodeKey,
        outcome: Result<ActionResult>,
        states: &mut BTreeMap<ResourceId, State>,
    ) -> Result<Step> {
        let node = lookup(graph, key)?;
        let state = states.get_mut(node.resource.id()).ok_or_else(|| {
            KernError::State(format!("no state tracked for {}", node.resource.id()))
        })?;

        let recorded = outcome.and_then(|result| {
            state.set_result(&node.action, node.env_name.as_deref(), result)
        });
        match recorded {
            Ok(()) => {
                state.mark_succeeded(&node.action);
                for dep in &node.deps {
                    state.add_dep(dep.id.clone(), dep.hash.clone());
                }
                info!(node = %key, "action succeeded");
                Ok(Step::from_node(node))
            }
            Err(err) => {
                state.mark_failed(&node.action);
                error!(node = %key, error = %err, "action failed");
                Err(err)
            }
        }
    }
}

/// Substitute `$Kind:name.action.key` values with the outputs the
/// dependency recorded, preferring the node's own environment.
fn resolve_spec(node: &PlanNode, states: &BTreeMap<ResourceId, State>) -> Result<Resource> {
    let env = node.env_name.as_deref();
    node.resource.with_resolved_spec(|r: &SpecRef| {
        let missing = |why: &str| {
            KernError::ResourceSpec(format!(
                "{}: cannot resolve ${}.{}.{}: {why}",
                node.resource.id(),
                r.id,
                r.action,
                r.key
            ))
        };
        let id: ResourceId = r.id.parse().map_err(|_| missing("invalid resource id"))?;
        let state = states.get(&id).ok_or_else(|| missing("resource has no state"))?;
        let result = state
            .result(&r.action, env)
            .or_else(|| state.result(&r.action, None))
            .ok_or_else(|| missing("action has no result"))?;
        match result.outputs.get(&r.key) {
            None | Some(serde_json::Value::Null) => Err(missing("no such output")),
            Some(value) => toml::Value::try_from(value).map_err(|e| missing(&e.to_string())),
        }
    })
}

fn lookup<'g>(graph: &'g PlanGraph, key: &NodeKey) -> Result<&'g PlanNode> {
    graph
        .node(key)
        .ok_or_else(|| KernError::State(format!("node {key} is not part of the plan")))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
