// src/plan/rerun.rs

use std::fmt;

use crate::action::ActionHandler;
use crate::plan::graph::ResolvedDep;
use crate::resource::{ContentHash, Resource, ResourceId};
use crate::state::StateSnapshot;

/// Why an action has to run again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RerunReason {
    /// The state was recorded under a different content hash.
    NewHash,
    /// The action failed last time.
    ErrorStatus,
    /// The resource has dependencies but none were ever recorded.
    NewDeps,
    /// A dependency that was not there last time.
    NewDep(ResourceId),
    /// A dependency's content hash differs from the one recorded.
    DepChanged(ResourceId),
    /// No result for this action in this environment yet.
    NewActionInEnv,
    /// The handler asked for it.
    Forced,
}

impl fmt::Display for RerunReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RerunReason::NewHash => f.write_str("new hash"),
            RerunReason::ErrorStatus => f.write_str("error status"),
            RerunReason::NewDeps => f.write_str("new deps"),
            RerunReason::NewDep(id) => write!(f, "new dep {id}"),
            RerunReason::DepChanged(id) => write!(f, "dep {id} changed"),
            RerunReason::NewActionInEnv => f.write_str("new action in env"),
            RerunReason::Forced => f.write_str("forced by resource"),
        }
    }
}

/// Decide whether `action` must run for `resource`; `None` when the recorded
/// state still satisfies it.
pub fn re_action(
    action: &str,
    resource: &Resource,
    hash: &ContentHash,
    prior: &StateSnapshot,
    env: Option<&str>,
    deps: &[ResolvedDep],
    handler: &dyn ActionHandler,
) -> Option<RerunReason> {
    if &prior.hash != hash {
        return Some(RerunReason::NewHash);
    }
    if prior.last_error() == Some(action) {
        return Some(RerunReason::ErrorStatus);
    }
    if !deps.is_empty() && prior.deps.is_empty() {
        return Some(RerunReason::NewDeps);
    }
    for dep in deps {
        match prior.dep(&dep.id) {
            None => return Some(RerunReason::NewDep(dep.id.clone())),
            Some(recorded) if recorded != &dep.hash => {
                return Some(RerunReason::DepChanged(dep.id.clone()));
            }
            Some(_) => {}
        }
    }
    if !prior.has_result(action, env) {
        return Some(RerunReason::NewActionInEnv);
    }
    if handler.force_rerun(action, resource, prior, env) {
        return Some(RerunReason::Forced);
    }
    None
}
