// src/plan/planner.rs

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::action::ActionRegistry;
use crate::errors::{KernError, Result};
use crate::plan::graph::{DependencyMap, NodeKey, PlanGraph, PlanNode, ResolvedDep};
use crate::plan::rerun::re_action;
use crate::resource::{ContentHash, DepDecl, Resource, ResourceId, ResourceSpace};
use crate::state::{State, StateSnapshot};
use crate::store::Store;

/// Action required of the environment a resource is bound to.
const ENV_ACTION: &str = "deploy";

/// The finished plan: graph plus the state of every resource it touches.
#[derive(Debug)]
pub struct Plan {
    pub graph: PlanGraph,
    pub states: BTreeMap<ResourceId, State>,
}

/// First and last planned node of one `(action, resource)`.
#[derive(Debug, Clone, Default)]
struct Planned {
    first: Option<NodeKey>,
    last: Option<NodeKey>,
}

/// Environment binding of one resource for one invocation.
struct EnvBinding {
    resource: Option<Resource>,
    name: Option<String>,
}

/// Builds the plan graph for one request.
///
/// Dependencies are planned depth first. Every lifecycle action up to the
/// requested one that needs a re-run becomes a node, chained in lifecycle
/// order; a dependency's last node runs before the dependent's first one.
pub struct Planner<'a> {
    store: &'a mut dyn Store,
    space: &'a ResourceSpace,
    registry: &'a ActionRegistry,
    graph: PlanGraph,
    states: BTreeMap<ResourceId, State>,
    planned: HashMap<(String, ResourceId), Planned>,
    in_progress: Vec<(String, ResourceId)>,
}

impl<'a> Planner<'a> {
    pub fn new(
        store: &'a mut dyn Store,
        space: &'a ResourceSpace,
        registry: &'a ActionRegistry,
    ) -> Self {
        Self {
            store,
            space,
            registry,
            graph: PlanGraph::new(),
            states: BTreeMap::new(),
            planned: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    /// Plan `action` on `resource`, whose prior state is `prior`.
    pub fn plan(
        &mut self,
        action: &str,
        resource: &Resource,
        env: Option<&Resource>,
        prior: &StateSnapshot,
    ) -> Result<()> {
        self.registry.ensure_known(action)?;
        self.states
            .entry(resource.id().clone())
            .or_insert_with(|| State::from_data((**prior).clone()));

        let hash = prior.hash.clone();
        let planned = self.plan_resource(action, resource, env, &hash, prior)?;
        self.graph.topological_order()?;
        info!(
            resource = %resource.id(),
            action,
            nodes = self.graph.len(),
            edges = self.graph.edges().len(),
            first = ?planned.first.as_ref().map(NodeKey::as_str),
            "plan ready"
        );
        Ok(())
    }

    pub fn dependencies(&self) -> DependencyMap {
        self.graph.dependencies()
    }

    pub fn states(&self) -> &BTreeMap<ResourceId, State> {
        &self.states
    }

    /// State a node reads and writes.
    pub fn state_of(&self, node: &PlanNode) -> Option<&State> {
        self.states.get(node.resource.id())
    }

    pub fn graph(&self) -> &PlanGraph {
        &self.graph
    }

    pub fn into_plan(self) -> Plan {
        Plan {
            graph: self.graph,
            states: self.states,
        }
    }

    /// Snapshot of the state of `resource` at `hash`, fetched from the store
    /// on first use.
    fn track_state(&mut self, resource: &Resource, hash: &ContentHash) -> Result<StateSnapshot> {
        if let Some(state) = self.states.get(resource.id()) {
            return Ok(state.snapshot());
        }
        let state = self.store.get(resource.id(), hash)?;
        let snapshot = state.snapshot();
        self.states.insert(resource.id().clone(), state);
        Ok(snapshot)
    }

    fn plan_resource(
        &mut self,
        action: &str,
        resource: &Resource,
        env: Option<&Resource>,
        hash: &ContentHash,
        prior: &StateSnapshot,
    ) -> Result<Planned> {
        let memo_key = (action.to_string(), resource.id().clone());
        if let Some(planned) = self.planned.get(&memo_key) {
            return Ok(planned.clone());
        }
        if let Some(pos) = self.in_progress.iter().position(|k| k == &memo_key) {
            let chain: Vec<String> = self.in_progress[pos..]
                .iter()
                .chain(std::iter::once(&memo_key))
                .map(|(a, id)| format!("{a}:{id}"))
                .collect();
            return Err(KernError::DagCycle(chain.join(" -> ")));
        }

        self.in_progress.push(memo_key.clone());
        let result = self.plan_resource_inner(action, resource, env, hash, prior);
        self.in_progress.pop();

        let planned = result?;
        self.planned.insert(memo_key, planned.clone());
        Ok(planned)
    }

    fn plan_resource_inner(
        &mut self,
        action: &str,
        resource: &Resource,
        env: Option<&Resource>,
        hash: &ContentHash,
        prior: &StateSnapshot,
    ) -> Result<Planned> {
        let binding = self.bind_env(resource, env)?;

        let mut resolved = Vec::new();
        let mut dep_lasts = Vec::new();
        for dep in self.collect_deps(resource, binding.resource.as_ref()) {
            if let Some(action1) = dep.action1.as_deref() {
                self.registry.ensure_known(action1)?;
                if !self.registry.is_at_or_after(action, action1) {
                    debug!(resource = %resource.id(), dep = %dep.id, action1, "dependency not applicable");
                    continue;
                }
            }
            let action2 = dep.action2.clone().unwrap_or_else(|| action.to_string());
            self.registry.ensure_known(&action2)?;

            let dep_resource = self
                .space
                .find_resource_by_id(&dep.id)
                .map_err(|e| KernError::ResourceConfig(format!("{resource}: {e}")))?
                .ok_or_else(|| {
                    KernError::ResourceConfig(format!(
                        "{resource} depends on unknown resource {}",
                        dep.id
                    ))
                })?;
            let dep_hash = self.space.calculate_hash(&dep_resource)?;
            let dep_prior = self.track_state(&dep_resource, &dep_hash)?;
            let dep_planned = self.plan_resource(&action2, &dep_resource, env, &dep_hash, &dep_prior)?;

            if let Some(last) = dep_planned.last {
                dep_lasts.push(last);
            }
            resolved.push(ResolvedDep {
                id: dep_resource.id().clone(),
                hash: dep_hash,
                action1: dep.action1.clone(),
                action2,
            });
        }

        let handler = self.registry.handler(resource.kind())?;
        let lifecycle: Vec<String> = self.registry.lifecycle_through(action)?.to_vec();

        let mut planned = Planned::default();
        for step in &lifecycle {
            // Dependencies gated on a later action do not affect earlier ones.
            let deps: Vec<ResolvedDep> = resolved
                .iter()
                .filter(|d| {
                    d.action1
                        .as_deref()
                        .is_none_or(|a1| self.registry.is_at_or_after(step, a1))
                })
                .cloned()
                .collect();

            let reason = re_action(
                step,
                resource,
                hash,
                prior,
                binding.name.as_deref(),
                &deps,
                handler.as_ref(),
            );
            let Some(reason) = reason else {
                debug!(resource = %resource.id(), action = %step, "up to date");
                continue;
            };

            let key = NodeKey::new(step, resource.id(), binding.name.as_deref(), hash);
            info!(node = %key, reason = %reason, "planning action");
            self.graph.add_node(PlanNode {
                key: key.clone(),
                resource: resource.clone(),
                action: step.clone(),
                env: binding.resource.clone(),
                env_name: binding.name.clone(),
                hash: hash.clone(),
                reason,
                deps,
            });

            if let Some(prev) = &planned.last {
                self.graph.add_edge(prev, &key)?;
            }
            if planned.first.is_none() {
                planned.first = Some(key.clone());
            }
            planned.last = Some(key);
        }

        if let Some(first) = &planned.first {
            for dep_last in &dep_lasts {
                self.graph.add_edge(dep_last, first)?;
            }
        }
        Ok(planned)
    }

    /// Env resources are their own environment; others use `metadata.env`
    /// when set, else the invocation env.
    fn bind_env(&self, resource: &Resource, env: Option<&Resource>) -> Result<EnvBinding> {
        if resource.is_env() {
            return Ok(EnvBinding {
                resource: None,
                name: Some(resource.name().to_string()),
            });
        }

        let env_resource = match resource.env_name() {
            Some(name) => Some(self.space.find_env(name)?.ok_or_else(|| {
                KernError::ResourceSpec(format!("{resource} is bound to unknown env {name}"))
            })?),
            None => env.cloned(),
        };
        Ok(EnvBinding {
            name: env_resource.as_ref().map(|e| e.name().to_string()),
            resource: env_resource,
        })
    }

    /// Declared, spec-referenced and environment dependencies, without
    /// duplicate `(id, action1, action2)` entries.
    fn collect_deps(&self, resource: &Resource, env: Option<&Resource>) -> Vec<DepDecl> {
        let mut deps = resource.declared_deps();
        deps.extend(resource.spec_deps());
        if let Some(env) = env {
            if resource.depends_on_env() {
                deps.push(DepDecl {
                    id: env.id().to_string(),
                    action1: None,
                    action2: Some(ENV_ACTION.to_string()),
                });
            }
        }

        let mut unique: Vec<DepDecl> = Vec::with_capacity(deps.len());
        for dep in deps {
            if !unique.contains(&dep) {
                unique.push(dep);
            }
        }
        unique
    }
}
