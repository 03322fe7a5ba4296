// src/action/env.rs

use tracing::debug;

use crate::action::{ActionContext, ActionHandler};
use crate::state::ActionResult;

/// Handler for `Env` resources.
///
/// Environments have nothing to do themselves; they are planned as `deploy`
/// dependencies of the resources bound to them so their content hash takes
/// part in change detection.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvHandler;

impl ActionHandler for EnvHandler {
    fn run(&self, ctx: &ActionContext) -> anyhow::Result<ActionResult> {
        debug!(resource = %ctx.resource.id(), action = %ctx.action, "environment ready");
        Ok(ActionResult::default())
    }
}
