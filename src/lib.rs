// src/lib.rs

pub mod action;
pub mod cli;
pub mod config;
pub mod diagram;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod plan;
pub mod resource;
pub mod state;
pub mod store;
pub mod types;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::action::ActionRegistry;
use crate::cli::CliArgs;
use crate::config::load_or_default;
use crate::engine::{ActionRequest, main_action};
use crate::exec::CancelFlag;
use crate::fs::RealFileSystem;
use crate::resource::resolve_resource_file;
use crate::store::open_store;

/// High-level entry point used by `main.rs`.
///
/// Loads `Kern.toml`, opens the configured store, wires Ctrl-C to the cancel
/// flag and runs the request.
pub async fn run(args: CliArgs) -> Result<()> {
    let declaration = resolve_resource_file(&RealFileSystem, &args.resource)?;

    let mut request = ActionRequest::new(&args.resource, &args.action);
    request.env = args.env.clone();
    request.base_path = args.base_path.clone();
    request.plan_file = args.plan_file.clone();
    let base = request.base_for(&declaration);

    let config = load_or_default(args.config.as_deref(), &base)
        .with_context(|| format!("loading configuration for {}", base.display()))?;
    request.executor = args
        .executor
        .map(Into::into)
        .unwrap_or(config.executor().kind);
    request.max_parallel = config.executor().max_parallel;

    let mut store = open_store(&config, &base);
    let registry = ActionRegistry::with_defaults();

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("interrupt received, stopping after the running action");
            cancel.cancel();
        });
    }

    match main_action(&request, store.as_mut(), &registry, cancel).await? {
        None => {
            if let Some(path) = &request.plan_file {
                info!(path = %path.display(), "plan written, nothing executed");
            }
        }
        Some(steps) if steps.is_empty() => info!("everything up to date"),
        Some(steps) => {
            for step in &steps {
                info!(
                    resource = %step.resource,
                    action = %step.action,
                    env = step.env.as_deref().unwrap_or("-"),
                    "executed"
                );
            }
        }
    }
    Ok(())
}
