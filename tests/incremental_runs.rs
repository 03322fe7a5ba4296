// tests/incremental_runs.rs

mod common;
use crate::common::*;

use kern::config::KernConfig;
use kern::engine::{ActionRequest, main_action};
use kern::exec::CancelFlag;
use kern::resource::ResourceId;
use kern::store::open_store;
use kern::types::ExecutorKind;

fn build_a(ws: &Workspace) -> ActionRequest {
    ActionRequest::new(ws.join("a"), "build").with_base_path(ws.path())
}

#[tokio::test]
async fn dependency_runs_first_and_unchanged_rerun_does_nothing() -> TestResult {
    init_tracing();
    let ws = two_resource_workspace()?;
    let handler = RecordingHandler::new().with_file_artifacts();
    let registry = registry_with(KIND, &handler);
    let mut store = memory_store();

    let steps = main_action(&build_a(&ws), &mut store, &registry, CancelFlag::new())
        .await?
        .expect("execution branch returns steps");
    assert_eq!(labels(&steps), ["build:Task:b", "build:Task:a"]);
    assert_eq!(handler.labels(), ["build:Task:b", "build:Task:a"]);

    // Both artifacts were recorded, and the files themselves swept.
    for (id, file) in [("Task:a", "a-build.out"), ("Task:b", "b-build.out")] {
        let id: ResourceId = id.parse()?;
        let persisted = store.backend().persisted(&id).expect("state persisted");
        let recorded: Vec<String> = persisted
            .values()
            .flat_map(|s| s.artifacts("build", None).iter().map(|a| a.relative_path.clone()))
            .collect();
        assert_eq!(recorded, [file]);
    }
    assert!(!ws.exists("a/a-build.out"));
    assert!(!ws.exists("b/b-build.out"));

    handler.reset();
    let steps = main_action(&build_a(&ws), &mut store, &registry, CancelFlag::new())
        .await?
        .expect("execution branch returns steps");
    assert!(steps.is_empty(), "unexpected steps: {steps:?}");
    assert!(handler.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn changing_dependency_reruns_it_and_its_dependent() -> TestResult {
    init_tracing();
    let ws = two_resource_workspace()?;
    let handler = RecordingHandler::new();
    let registry = registry_with(KIND, &handler);
    let mut store = memory_store();

    main_action(&build_a(&ws), &mut store, &registry, CancelFlag::new()).await?;

    ws.write_file("b/src.txt", "b v2")?;
    let steps = main_action(&build_a(&ws), &mut store, &registry, CancelFlag::new())
        .await?
        .unwrap_or_default();
    assert_eq!(labels(&steps), ["build:Task:b", "build:Task:a"]);
    Ok(())
}

#[tokio::test]
async fn changing_only_the_dependent_reruns_only_it() -> TestResult {
    init_tracing();
    let ws = two_resource_workspace()?;
    let handler = RecordingHandler::new();
    let registry = registry_with(KIND, &handler);
    let mut store = memory_store();

    main_action(&build_a(&ws), &mut store, &registry, CancelFlag::new()).await?;

    ws.write_file("a/src.txt", "a v2")?;
    let steps = main_action(&build_a(&ws), &mut store, &registry, CancelFlag::new())
        .await?
        .unwrap_or_default();
    assert_eq!(labels(&steps), ["build:Task:a"]);
    Ok(())
}

#[tokio::test]
async fn file_store_carries_state_across_processes() -> TestResult {
    init_tracing();
    let ws = two_resource_workspace()?;
    let handler = RecordingHandler::new();
    let registry = registry_with(KIND, &handler);
    let config = KernConfig::default();

    {
        let mut store = open_store(&config, ws.path());
        let steps = main_action(&build_a(&ws), store.as_mut(), &registry, CancelFlag::new())
            .await?
            .unwrap_or_default();
        assert_eq!(steps.len(), 2);
    }
    assert!(ws.exists(".kern/store/local/default/Task/b/states.json"));
    assert!(ws.exists(".kern/store/local/default/Task/a/states.json"));

    let mut store = open_store(&config, ws.path());
    let steps = main_action(&build_a(&ws), store.as_mut(), &registry, CancelFlag::new())
        .await?
        .unwrap_or_default();
    assert!(steps.is_empty());
    Ok(())
}

#[tokio::test]
async fn reverting_content_reuses_the_older_state() -> TestResult {
    init_tracing();
    let ws = two_resource_workspace()?;
    let handler = RecordingHandler::new();
    let registry = registry_with(KIND, &handler);
    let mut store = memory_store();

    main_action(&build_a(&ws), &mut store, &registry, CancelFlag::new()).await?;
    ws.write_file("b/src.txt", "b v2")?;
    main_action(&build_a(&ws), &mut store, &registry, CancelFlag::new()).await?;

    // b at v1 was built before; only a has to follow the dependency back.
    ws.write_file("b/src.txt", "b v1")?;
    let steps = main_action(&build_a(&ws), &mut store, &registry, CancelFlag::new())
        .await?
        .unwrap_or_default();
    assert_eq!(labels(&steps), ["build:Task:a"]);
    Ok(())
}

#[tokio::test]
async fn later_action_plans_the_whole_lifecycle_chain() -> TestResult {
    init_tracing();
    let ws = two_resource_workspace()?;
    let handler = RecordingHandler::new();
    let registry = registry_with(KIND, &handler);
    let mut store = memory_store();

    let request = ActionRequest::new(ws.join("a"), "test").with_base_path(ws.path());
    let steps = main_action(&request, &mut store, &registry, CancelFlag::new())
        .await?
        .unwrap_or_default();
    assert_eq!(
        labels(&steps),
        ["build:Task:b", "test:Task:b", "build:Task:a", "test:Task:a"]
    );

    // `build` is already satisfied now.
    let steps = main_action(&build_a(&ws), &mut store, &registry, CancelFlag::new())
        .await?
        .unwrap_or_default();
    assert!(steps.is_empty());
    Ok(())
}

#[tokio::test]
async fn parallel_executor_gives_the_same_result() -> TestResult {
    init_tracing();
    let ws = two_resource_workspace()?;
    let handler = RecordingHandler::new().with_file_artifacts();
    let registry = registry_with(KIND, &handler);
    let mut store = memory_store();

    let request = build_a(&ws)
        .with_executor(ExecutorKind::Parallel)
        .with_max_parallel(4);
    let steps = with_timeout(main_action(&request, &mut store, &registry, CancelFlag::new()))
        .await?
        .unwrap_or_default();
    assert_eq!(labels(&steps), ["build:Task:b", "build:Task:a"]);
    assert!(!ws.exists("b/b-build.out"));

    let steps = main_action(&request, &mut store, &registry, CancelFlag::new())
        .await?
        .unwrap_or_default();
    assert!(steps.is_empty());
    Ok(())
}
