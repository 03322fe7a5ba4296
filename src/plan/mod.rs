// src/plan/mod.rs

//! Dependency planning.
//!
//! - `graph.rs`: [`PlanGraph`] arena, node keys, dependency map.
//! - `rerun.rs`: [`RerunReason`] and the re-run decision.
//! - `planner.rs`: [`Planner`], which walks resources and their
//!   dependencies and fills the graph.

pub mod graph;
pub mod planner;
pub mod rerun;

pub use graph::{DependencyMap, NodeKey, PlanGraph, PlanNode, ResolvedDep};
pub use planner::{Plan, Planner};
pub use rerun::{RerunReason, re_action};
