// tests/shell_handler.rs
#![cfg(unix)]

mod common;
use crate::common::*;

use kern::action::{ActionContext, ActionHandler, ActionRegistry, ShellHandler};
use kern::engine::{ActionRequest, main_action};
use kern::errors::KernError;
use kern::exec::CancelFlag;
use kern::fs::RealFileSystem;
use kern::resource::{ContentHash, Resource, ResourceId, load_resource};
use kern::state::StateSnapshot;

fn context(ws: &Workspace, resource: Resource, action: &str) -> ActionContext {
    let hash = ContentHash::new("0123456789abcdef");
    ActionContext {
        action: action.to_string(),
        prior: StateSnapshot::empty(resource.id().clone(), hash.clone()),
        resource,
        env: None,
        env_name: Some("staging".to_string()),
        hash,
        base: ws.path().to_path_buf(),
    }
}

#[test]
fn command_sees_kern_variables_and_output_is_recorded() -> TestResult {
    let ws = Workspace::new()?;
    ws.add_resource(
        "svc",
        &ResourceBuilder::new("Shell", "svc")
            .command("build", r#"printf '%s %s %s %s' "$KERN_ACTION" "$KERN_RESOURCE" "$KERN_ENV" "$KERN_HASH""#),
    )?;
    let resource = load_resource(&RealFileSystem, &ws.join("svc"))?;

    let result = ShellHandler::new().run(&context(&ws, resource, "build"))?;
    assert_eq!(result.outputs["exit_code"], 0);
    assert_eq!(
        result.outputs["stdout"],
        "build Shell:svc staging 0123456789abcdef"
    );
    assert!(result.artifacts.is_empty());
    Ok(())
}

#[test]
fn missing_command_is_a_no_op() -> TestResult {
    let ws = Workspace::new()?;
    ws.add_resource("svc", &ResourceBuilder::new("Shell", "svc"))?;
    let resource = load_resource(&RealFileSystem, &ws.join("svc"))?;

    let result = ShellHandler::new().run(&context(&ws, resource, "test"))?;
    assert!(result.outputs.is_empty());
    Ok(())
}

#[test]
fn failing_command_reports_stderr_tail() -> TestResult {
    let ws = Workspace::new()?;
    ws.add_resource(
        "svc",
        &ResourceBuilder::new("Shell", "svc").command(
            "build",
            "for i in $(seq 1 30); do echo line$i >&2; done; exit 3",
        ),
    )?;
    let resource = load_resource(&RealFileSystem, &ws.join("svc"))?;

    let err = ShellHandler::new()
        .run(&context(&ws, resource, "build"))
        .expect_err("exit 3");
    let message = err.to_string();
    assert!(message.contains("exited with status 3"), "{message}");
    assert!(message.contains("line30"));
    assert!(message.contains("line11"));
    assert!(!message.contains("line10"), "only the last lines are kept: {message}");
    Ok(())
}

#[test]
fn declared_artifacts_resolve_against_the_resource_dir() -> TestResult {
    let ws = Workspace::new()?;
    ws.add_resource(
        "svc",
        &ResourceBuilder::new("Shell", "svc")
            .command("build", "mkdir -p dist && echo ok > dist/app.txt")
            .artifact("build", "dist/app.txt")
            .artifact("test", "report.xml"),
    )?;
    let resource = load_resource(&RealFileSystem, &ws.join("svc"))?;

    let result = ShellHandler::new().run(&context(&ws, resource, "build"))?;
    assert_eq!(result.artifacts.len(), 1);
    let artifact = &result.artifacts[0];
    assert!(artifact.is_file());
    assert_eq!(artifact.relative_path, "dist/app.txt");
    assert_eq!(artifact.env.as_deref(), Some("staging"));
    assert_eq!(artifact.path(), Some(ws.join("svc/dist/app.txt")));
    assert!(ws.exists("svc/dist/app.txt"));
    Ok(())
}

#[tokio::test]
async fn shell_resources_run_through_the_default_registry() -> TestResult {
    init_tracing();
    let ws = Workspace::new()?;
    ws.add_resource(
        "svc",
        &ResourceBuilder::new("Shell", "svc")
            .command("build", "echo built > out.txt && echo done")
            .artifact("build", "out.txt"),
    )?;
    let registry = ActionRegistry::with_defaults();
    let request = ActionRequest::new(ws.join("svc"), "build").with_base_path(ws.path());
    let mut store = memory_store();

    let steps = main_action(&request, &mut store, &registry, CancelFlag::new())
        .await?
        .expect("executed");
    assert_eq!(labels(&steps), ["build:Shell:svc"]);
    assert!(!ws.exists("svc/out.txt"), "file artifacts are swept after the run");

    let id: ResourceId = "Shell:svc".parse()?;
    let persisted = store.backend().persisted(&id).expect("svc persisted");
    let state = persisted.values().next().expect("one state");
    let result = state.result("build", None).expect("build result");
    assert_eq!(result.outputs["stdout"], "done");
    assert_eq!(result.artifacts.len(), 1);

    let again = main_action(&request, &mut store, &registry, CancelFlag::new())
        .await?
        .expect("executed");
    assert!(again.is_empty(), "unchanged resource is up to date: {:?}", labels(&again));
    Ok(())
}

#[tokio::test]
async fn failing_shell_command_surfaces_as_action_failure() -> TestResult {
    let ws = Workspace::new()?;
    ws.add_resource(
        "svc",
        &ResourceBuilder::new("Shell", "svc").command("build", "echo broken >&2; exit 1"),
    )?;
    let registry = ActionRegistry::with_defaults();
    let request = ActionRequest::new(ws.join("svc"), "build").with_base_path(ws.path());
    let mut store = memory_store();

    let err = main_action(&request, &mut store, &registry, CancelFlag::new())
        .await
        .expect_err("command fails");
    match err {
        KernError::ActionFailed { node, source } => {
            assert!(node.starts_with("build:Shell:svc:"), "{node}");
            assert!(source.to_string().contains("broken"), "{source}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}
