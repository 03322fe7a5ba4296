// tests/artifact_archive.rs

mod common;
use crate::common::*;

use std::sync::Arc;

use kern::fs::FileSystem;
use kern::fs::mock::MockFileSystem;
use kern::resource::{ContentHash, ResourceId};
use kern::state::{ActionResult, Artifact, State};
use kern::store::{MemoryBackend, StateStore, Store};

fn id(s: &str) -> ResourceId {
    s.parse().expect("valid id")
}

fn file_artifact(path: &str) -> Artifact {
    Artifact {
        id: "app.tar".into(),
        action: "build".into(),
        env: None,
        hash: "h1".into(),
        kind: "file".into(),
        data: path.into(),
        relative_path: "dist/app.tar".into(),
    }
}

fn built_state(path: &str) -> Result<State, Box<dyn std::error::Error>> {
    let mut state = State::new(id("Shell:app"), ContentHash::new("h1"));
    state.set_result("build", None, ActionResult::default().with_artifact(file_artifact(path)))?;
    Ok(state)
}

#[test]
fn persisted_file_artifacts_come_back_when_the_state_is_reused() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("ws/app/dist/app.tar", "payload");
    let mut store = StateStore::with_fs(MemoryBackend::new(), Arc::new(fs.clone()));

    store.save(&built_state("ws/app/dist/app.tar")?)?;
    store.persist_states()?;
    assert_eq!(store.backend().artifact_count(), 1);

    fs.remove_file("ws/app/dist/app.tar".as_ref())?;
    let reused = store.get(&id("Shell:app"), &ContentHash::new("h1"))?;
    assert!(reused.result("build", None).is_some());
    assert_eq!(fs.read_to_string("ws/app/dist/app.tar".as_ref())?, "payload");
    Ok(())
}

#[test]
fn state_without_archived_files_is_not_reused() -> TestResult {
    let fs = MockFileSystem::new();
    let mut store = StateStore::with_fs(MemoryBackend::new(), Arc::new(fs.clone()));

    // The file never existed, so there is nothing to put back later.
    store.save(&built_state("ws/app/dist/app.tar")?)?;
    store.persist_states()?;
    assert_eq!(store.backend().artifact_count(), 0);

    let state = store.get(&id("Shell:app"), &ContentHash::new("h1"))?;
    assert!(state.result("build", None).is_none(), "stale state must be rebuilt");
    assert!(!fs.is_file("ws/app/dist/app.tar".as_ref()));
    Ok(())
}

#[cfg(unix)]
mod shell {
    use super::*;

    use kern::action::ActionRegistry;
    use kern::engine::{ActionRequest, main_action};
    use kern::exec::CancelFlag;
    use kern::store::{FileBackend, StateBackend};

    fn workspace() -> std::io::Result<Workspace> {
        let ws = Workspace::new()?;
        ws.add_resource(
            "app",
            &ResourceBuilder::new("Shell", "app")
                .command("build", "mkdir -p dist && echo payload > dist/app.tar")
                .artifact("build", "dist/app.tar"),
        )?;
        ws.add_resource(
            "site",
            &ResourceBuilder::new("Shell", "site")
                .depends_on("Shell:app")
                .command("build", "cat ../app/dist/app.tar"),
        )?;
        ws.write_file("site/index.txt", "v1")?;
        Ok(ws)
    }

    #[tokio::test]
    async fn swept_artifact_is_archived_and_restored_for_dependents() -> TestResult {
        init_tracing();
        let ws = workspace()?;
        let registry = ActionRegistry::with_defaults();
        let request = ActionRequest::new(ws.join("site"), "build").with_base_path(ws.path());
        let mut store = StateStore::new(FileBackend::new(ws.store_dir()));

        let steps = main_action(&request, &mut store, &registry, CancelFlag::new())
            .await?
            .expect("executed");
        assert_eq!(labels(&steps), ["build:Shell:app", "build:Shell:site"]);
        assert!(!ws.exists("app/dist/app.tar"), "workspace copy is swept");

        let app = id("Shell:app");
        let persisted = store.backend().load(&app)?;
        let (hash, data) = persisted.iter().next().expect("app persisted");
        let artifact = data.artifacts("build", None).first().expect("app recorded its artifact");
        let archived = store.backend().artifact_path(&app, artifact);
        assert!(archived.starts_with(ws.store_dir().join("Shell/app")));
        assert_eq!(std::fs::read_to_string(&archived)?, "payload\n");

        // A fresh store over the same directory puts the file back.
        let mut reopened = StateStore::new(FileBackend::new(ws.store_dir()));
        let state = reopened.get(&app, hash)?;
        assert!(state.result("build", None).is_some());
        assert_eq!(std::fs::read_to_string(ws.join("app/dist/app.tar"))?, "payload\n");
        std::fs::remove_file(ws.join("app/dist/app.tar"))?;

        // Only the dependent changed: app is reused and its file is there.
        ws.write_file("site/index.txt", "v2")?;
        let steps = main_action(&request, &mut store, &registry, CancelFlag::new())
            .await?
            .expect("executed");
        assert_eq!(labels(&steps), ["build:Shell:site"]);
        assert!(!ws.exists("app/dist/app.tar"), "restored copy is swept again");

        let steps = main_action(&request, &mut store, &registry, CancelFlag::new())
            .await?
            .expect("executed");
        assert!(steps.is_empty(), "restoring must not change hashes: {:?}", labels(&steps));
        Ok(())
    }
}
