// tests/env_resolution.rs

mod common;
use crate::common::*;

use kern::engine::{ActionRequest, main_action};
use kern::errors::KernError;
use kern::exec::CancelFlag;

fn workspace_with_envs() -> std::io::Result<Workspace> {
    let ws = Workspace::new()?;
    ws.add_resource("envs/dev", &ResourceBuilder::env_resource("dev"))?;
    ws.add_resource("envs/prod", &ResourceBuilder::env_resource("prod"))?;
    Ok(ws)
}

#[tokio::test]
async fn unknown_env_fails_before_any_action() -> TestResult {
    init_tracing();
    let ws = workspace_with_envs()?;
    ws.add_resource("a", &ResourceBuilder::new(KIND, "a"))?;
    let handler = RecordingHandler::new().with_file_artifacts();
    let registry = registry_with(KIND, &handler);
    let mut store = CountingStore::new();

    let request = ActionRequest::new(ws.join("a"), "build")
        .with_base_path(ws.path())
        .with_env("nope");
    let err = main_action(&request, &mut store, &registry, CancelFlag::new())
        .await
        .expect_err("env does not exist");

    assert!(err.is_resource_error(), "{err:?}");
    assert!(handler.calls().is_empty());
    assert!(!ws.exists("a/a-build.out"));
    assert_eq!(store.persists, 0);
    Ok(())
}

#[tokio::test]
async fn missing_resource_file_is_a_resource_error() -> TestResult {
    init_tracing();
    let ws = Workspace::new()?;
    let handler = RecordingHandler::new();
    let registry = registry_with(KIND, &handler);
    let mut store = memory_store();

    let request = ActionRequest::new(ws.join("missing"), "build");
    let err = main_action(&request, &mut store, &registry, CancelFlag::new())
        .await
        .expect_err("nothing to load");
    assert!(err.is_resource_error(), "{err:?}");
    Ok(())
}

#[tokio::test]
async fn invocation_env_is_deployed_first_and_scopes_results() -> TestResult {
    init_tracing();
    let ws = workspace_with_envs()?;
    ws.add_resource("a", &ResourceBuilder::new(KIND, "a"))?;
    let handler = RecordingHandler::new();
    let registry = registry_with(KIND, &handler);
    let mut store = memory_store();

    let request = ActionRequest::new(ws.join("a"), "build")
        .with_base_path(ws.path())
        .with_env("dev");
    let steps = main_action(&request, &mut store, &registry, CancelFlag::new())
        .await?
        .unwrap_or_default();

    assert_eq!(
        labels(&steps),
        [
            "build:Env:dev",
            "test:Env:dev",
            "publish:Env:dev",
            "deploy:Env:dev",
            "build:Task:a",
        ]
    );
    assert!(steps.iter().all(|s| s.env.as_deref() == Some("dev")));
    assert_eq!(
        handler.calls(),
        [Call {
            resource: "Task:a".into(),
            action: "build".into(),
            env: Some("dev".into()),
        }]
    );

    // Same env again: nothing to do.
    let steps = main_action(&request, &mut store, &registry, CancelFlag::new())
        .await?
        .unwrap_or_default();
    assert!(steps.is_empty());

    // Another env has no result for `a` yet.
    let prod = ActionRequest::new(ws.join("a"), "build")
        .with_base_path(ws.path())
        .with_env("prod");
    let steps = main_action(&prod, &mut store, &registry, CancelFlag::new())
        .await?
        .unwrap_or_default();
    assert_eq!(labels(&steps).last().map(String::as_str), Some("build:Task:a"));
    assert_eq!(steps.last().and_then(|s| s.env.clone()), Some("prod".to_string()));
    Ok(())
}

#[tokio::test]
async fn metadata_env_overrides_invocation_env() -> TestResult {
    init_tracing();
    let ws = workspace_with_envs()?;
    ws.add_resource("b", &ResourceBuilder::new(KIND, "b").env("prod"))?;
    ws.add_resource("a", &ResourceBuilder::new(KIND, "a").depends_on("Task:b"))?;
    let handler = RecordingHandler::new();
    let registry = registry_with(KIND, &handler);
    let mut store = memory_store();

    let request = ActionRequest::new(ws.join("a"), "build")
        .with_base_path(ws.path())
        .with_env("dev");
    main_action(&request, &mut store, &registry, CancelFlag::new()).await?;

    let calls = handler.calls();
    let env_of = |id: &str| calls.iter().find(|c| c.resource == id).and_then(|c| c.env.clone());
    assert_eq!(env_of("Task:b"), Some("prod".to_string()));
    assert_eq!(env_of("Task:a"), Some("dev".to_string()));
    Ok(())
}

#[tokio::test]
async fn unknown_bound_env_is_a_spec_error() -> TestResult {
    init_tracing();
    let ws = workspace_with_envs()?;
    ws.add_resource("a", &ResourceBuilder::new(KIND, "a").env("staging"))?;
    let handler = RecordingHandler::new();
    let registry = registry_with(KIND, &handler);
    let mut store = memory_store();

    let request = ActionRequest::new(ws.join("a"), "build").with_base_path(ws.path());
    let err = main_action(&request, &mut store, &registry, CancelFlag::new())
        .await
        .expect_err("staging is not declared");
    assert!(matches!(err, KernError::ResourceSpec(_)), "{err:?}");
    assert!(handler.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn depends_on_env_false_skips_the_env_dependency() -> TestResult {
    init_tracing();
    let ws = workspace_with_envs()?;
    ws.add_resource(
        "a",
        &ResourceBuilder::new(KIND, "a").spec("depends_on_env", false),
    )?;
    let handler = RecordingHandler::new();
    let registry = registry_with(KIND, &handler);
    let mut store = memory_store();

    let request = ActionRequest::new(ws.join("a"), "build")
        .with_base_path(ws.path())
        .with_env("dev");
    let steps = main_action(&request, &mut store, &registry, CancelFlag::new())
        .await?
        .unwrap_or_default();
    assert_eq!(labels(&steps), ["build:Task:a"]);
    assert_eq!(steps[0].env.as_deref(), Some("dev"));
    Ok(())
}
