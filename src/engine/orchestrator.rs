// src/engine/orchestrator.rs

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::action::ActionRegistry;
use crate::diagram::{DiagramExporter, DotExporter};
use crate::engine::cleanup::{finalize, sweep_file_artifacts};
use crate::engine::request::ActionRequest;
use crate::errors::{KernError, Result};
use crate::exec::{CancelFlag, NodeRunner, Step, build_executor};
use crate::fs::{FileSystem, RealFileSystem};
use crate::plan::{Plan, Planner};
use crate::resource::{ResourceSpace, load_resource, resolve_resource_file};
use crate::store::Store;

/// Run one request against the real filesystem.
///
/// Returns the executed steps, or `None` when a plan diagram was written
/// instead of executing.
pub async fn main_action(
    request: &ActionRequest,
    store: &mut dyn Store,
    registry: &ActionRegistry,
    cancel: CancelFlag,
) -> Result<Option<Vec<Step>>> {
    main_action_with_fs(request, store, registry, cancel, Arc::new(RealFileSystem)).await
}

/// [`main_action`] over an arbitrary [`FileSystem`].
pub async fn main_action_with_fs(
    request: &ActionRequest,
    store: &mut dyn Store,
    registry: &ActionRegistry,
    cancel: CancelFlag,
    fs: Arc<dyn FileSystem>,
) -> Result<Option<Vec<Step>>> {
    let file = resolve_resource_file(fs.as_ref(), &request.resource_file)?;
    let resource = load_resource(fs.as_ref(), &file)?;
    let base = request.base_for(&file);
    let space = ResourceSpace::new(&base, fs.clone());

    let env = match request.env.as_deref() {
        Some(name) => Some(
            space
                .find_env(name)?
                .ok_or_else(|| KernError::Resource(format!("Env:{name} not found")))?,
        ),
        None => None,
    };

    let hash = space.calculate_hash(&resource)?;
    info!(resource = %resource.id(), hash = hash.short(), action = %request.action, env = ?request.env, "starting");
    registry.ensure_known(&request.action)?;
    let state = store.get(resource.id(), &hash)?;

    let mut planner = Planner::new(store, &space, registry);
    if let Err(err) = planner.plan(&request.action, &resource, env.as_ref(), &state.snapshot()) {
        sweep_file_artifacts(fs.as_ref(), planner.states(), registry);
        return Err(err);
    }

    if let Some(plan_file) = &request.plan_file {
        let title = format!("{} {}", request.action, resource.id());
        let exported = DotExporter.export(fs.as_ref(), &planner.graph().edges(), &title, plan_file);
        sweep_file_artifacts(fs.as_ref(), planner.states(), registry);
        return exported.map(|()| None);
    }

    let deps = planner.dependencies();
    let Plan { graph, mut states } = planner.into_plan();

    let runner = NodeRunner::new(registry.clone(), &base, cancel);
    let mut executor = build_executor(request.executor, runner, request.max_parallel);
    debug!(executor = executor.name(), nodes = graph.len(), "executing plan");

    let executed = executor.execute(&graph, &deps, &mut states).await;
    let steps = executor.steps().to_vec();
    let persisted = finalize(store, fs.as_ref(), &states, registry);

    match (executed, persisted) {
        (Err(err), Err(persist_err)) => {
            error!(error = %persist_err, "states were not persisted after failed execution");
            Err(err)
        }
        (Err(err), Ok(())) => Err(err),
        (Ok(()), Err(persist_err)) => Err(persist_err),
        (Ok(()), Ok(())) => {
            info!(steps = steps.len(), "done");
            Ok(Some(steps))
        }
    }
}
