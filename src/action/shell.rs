// src/action/shell.rs

//! Runs `spec.<action>` as a shell command in the resource directory.

use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::action::{ActionContext, ActionHandler};
use crate::resource::Resource;
use crate::state::{ActionResult, FILE_KIND, StateSnapshot};

pub const SHELL_KIND: &str = "Shell";

/// How many trailing stderr lines end up in the error of a failed command.
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct ShellHandler {
    shell: Option<String>,
}

impl ShellHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific POSIX shell instead of `sh`.
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: Some(shell.into()),
        }
    }

    fn command(&self, script: &str) -> Command {
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(script);
            c
        } else {
            let mut c = Command::new(self.shell.as_deref().unwrap_or("sh"));
            c.arg("-c").arg(script);
            c
        }
    }
}

impl ActionHandler for ShellHandler {
    fn run(&self, ctx: &ActionContext) -> Result<ActionResult> {
        let resource = &ctx.resource;
        let Some(script) = resource.spec_str(&ctx.action) else {
            debug!(resource = %resource.id(), action = %ctx.action, "no command declared");
            return Ok(ActionResult::default());
        };

        info!(resource = %resource.id(), action = %ctx.action, cmd = %script, "running command");

        let mut cmd = self.command(script);
        cmd.current_dir(ctx.resource_dir())
            .env("KERN_ACTION", &ctx.action)
            .env("KERN_ENV", ctx.env_name().unwrap_or(""))
            .env("KERN_HASH", ctx.hash.as_str())
            .env("KERN_RESOURCE", resource.id().as_str())
            .stdin(Stdio::null());

        let output = cmd
            .output()
            .with_context(|| format!("spawning `{script}` for {}", resource.id()))?;

        let code = output.status.code().unwrap_or(-1);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
            bail!("`{script}` exited with status {code}\n{tail}");
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(resource = %resource.id(), exit_code = code, "command finished");

        let mut result = ActionResult::default()
            .with_output("exit_code", code)
            .with_output("stdout", stdout);
        for artifact in declared_artifacts(ctx)? {
            result = result.with_artifact(artifact);
        }
        Ok(result)
    }

    fn force_rerun(
        &self,
        action: &str,
        resource: &Resource,
        _prior: &StateSnapshot,
        _env: Option<&str>,
    ) -> bool {
        resource.spec_str_list("rerun").iter().any(|a| a == action)
    }
}

/// `[[spec.artifacts]]` entries for the running action:
///
/// ```toml
/// [[spec.artifacts]]
/// action = "build"
/// path = "dist/app.tar"
/// kind = "file"        # default
/// id = "tarball"       # default: the path
/// ```
fn declared_artifacts(ctx: &ActionContext) -> Result<Vec<crate::state::Artifact>> {
    let Some(entries) = ctx.resource.spec_value("artifacts") else {
        return Ok(Vec::new());
    };
    let entries = entries
        .as_array()
        .context("spec.artifacts must be an array of tables")?;

    let mut artifacts = Vec::new();
    for entry in entries {
        let table = entry
            .as_table()
            .context("spec.artifacts entries must be tables")?;
        let field = |key: &str| table.get(key).and_then(|v| v.as_str());

        if field("action") != Some(ctx.action.as_str()) {
            continue;
        }
        let path = field("path").context("spec.artifacts entry without `path`")?;
        let id = field("id").unwrap_or(path);
        let kind = field("kind").unwrap_or(FILE_KIND);

        artifacts.push(if kind == FILE_KIND {
            ctx.file_artifact(id, path)
        } else {
            ctx.artifact(id, kind, path)
        });
    }
    Ok(artifacts)
}
