// src/plan/graph.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::errors::{KernError, Result};
use crate::plan::rerun::RerunReason;
use crate::resource::{ContentHash, Resource, ResourceId};

/// `<action>:<resource id>:<env name|None>:<hash>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey(String);

impl NodeKey {
    pub fn new(action: &str, id: &ResourceId, env: Option<&str>, hash: &ContentHash) -> Self {
        Self(format!(
            "{action}:{id}:{}:{hash}",
            env.unwrap_or("None")
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// For every node, the keys of the nodes that must complete before it.
pub type DependencyMap = BTreeMap<NodeKey, BTreeSet<NodeKey>>;

/// A dependency as resolved while planning a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDep {
    pub id: ResourceId,
    pub hash: ContentHash,
    pub action1: Option<String>,
    /// Action required of the dependency.
    pub action2: String,
}

/// One `(resource, action, environment)` obligation.
#[derive(Debug, Clone)]
pub struct PlanNode {
    pub key: NodeKey,
    pub resource: Resource,
    pub action: String,
    pub env: Option<Resource>,
    /// Environment the result is recorded under (an Env resource's own name
    /// for Env nodes).
    pub env_name: Option<String>,
    pub hash: ContentHash,
    pub reason: RerunReason,
    /// Dependencies that applied to this action, recorded into the state on
    /// success.
    pub deps: Vec<ResolvedDep>,
}

/// Arena of plan nodes; an edge `a -> b` means `a` runs before `b`.
#[derive(Debug, Clone, Default)]
pub struct PlanGraph {
    graph: DiGraph<PlanNode, ()>,
    index: HashMap<NodeKey, NodeIndex>,
}

impl PlanGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node; a node with the same key is kept as is.
    pub fn add_node(&mut self, node: PlanNode) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.key) {
            return idx;
        }
        let key = node.key.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(key, idx);
        idx
    }

    /// `before` must complete before `after` starts.
    pub fn add_edge(&mut self, before: &NodeKey, after: &NodeKey) -> Result<()> {
        let (Some(&a), Some(&b)) = (self.index.get(before), self.index.get(after)) else {
            return Err(KernError::State(format!(
                "edge between unknown nodes {before} -> {after}"
            )));
        };
        if a == b {
            return Err(KernError::DagCycle(format!("{before} depends on itself")));
        }
        self.graph.update_edge(a, b, ());
        Ok(())
    }

    pub fn node(&self, key: &NodeKey) -> Option<&PlanNode> {
        self.index.get(key).map(|&idx| &self.graph[idx])
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.index.contains_key(key)
    }

    /// Nodes in key order.
    pub fn nodes(&self) -> Vec<&PlanNode> {
        let mut nodes: Vec<&PlanNode> = self.graph.node_weights().collect();
        nodes.sort_by(|a, b| a.key.cmp(&b.key));
        nodes
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// `(before, after)` key pairs, sorted.
    pub fn edges(&self) -> Vec<(NodeKey, NodeKey)> {
        let mut edges: Vec<(NodeKey, NodeKey)> = self
            .graph
            .edge_references()
            .map(|e| {
                (
                    self.graph[e.source()].key.clone(),
                    self.graph[e.target()].key.clone(),
                )
            })
            .collect();
        edges.sort();
        edges
    }

    /// Direct prerequisites of every node.
    pub fn dependencies(&self) -> DependencyMap {
        self.graph
            .node_indices()
            .map(|idx| {
                let deps = self
                    .graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .map(|dep| self.graph[dep].key.clone())
                    .collect();
                (self.graph[idx].key.clone(), deps)
            })
            .collect()
    }

    /// One valid execution order.
    pub fn topological_order(&self) -> Result<Vec<NodeKey>> {
        toposort(&self.graph, None)
            .map(|order| order.into_iter().map(|idx| self.graph[idx].key.clone()).collect())
            .map_err(|cycle| {
                KernError::DagCycle(format!("{} is part of a cycle", self.graph[cycle.node_id()].key))
            })
    }
}
