// src/store/file.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::{KernError, Result};
use crate::resource::ResourceId;
use crate::state::Artifact;
use crate::store::{StateBackend, StateMap};

const STATES_FILE: &str = "states.json";
const ARTIFACTS_DIR: &str = "artifacts";

/// JSON files under `<root>/<Kind>/<name>/states.json`, archived file
/// artifacts under `<root>/<Kind>/<name>/artifacts/`.
///
/// Each file maps content hash to state; older hashes are kept so that
/// reverting a resource's content reuses what was recorded for it.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resource_dir(&self, id: &ResourceId) -> PathBuf {
        self.root.join(id.kind()).join(id.name())
    }

    pub fn states_path(&self, id: &ResourceId) -> PathBuf {
        self.resource_dir(id).join(STATES_FILE)
    }

    /// Where the archived copy of `artifact` lives.
    pub fn artifact_path(&self, id: &ResourceId, artifact: &Artifact) -> PathBuf {
        self.resource_dir(id).join(ARTIFACTS_DIR).join(artifact.archive_key())
    }
}

/// Write through a sibling temp file so readers never see a partial file.
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| KernError::Store(format!("invalid store path {}", path.display())))?;
    fs::create_dir_all(dir)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl StateBackend for FileBackend {
    fn load(&self, id: &ResourceId) -> Result<StateMap> {
        let path = self.states_path(id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StateMap::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&contents) {
            Ok(states) => Ok(states),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable state file");
                Ok(StateMap::new())
            }
        }
    }

    fn write(&mut self, id: &ResourceId, states: &StateMap) -> Result<()> {
        let path = self.states_path(id);
        let body = serde_json::to_string_pretty(states)?;
        write_atomic(&path, body.as_bytes())?;
        debug!(resource = %id, path = %path.display(), "wrote states");
        Ok(())
    }

    fn store_artifact(&mut self, id: &ResourceId, artifact: &Artifact, contents: &[u8]) -> Result<()> {
        write_atomic(&self.artifact_path(id, artifact), contents)
    }

    fn read_artifact(&self, id: &ResourceId, artifact: &Artifact) -> Result<Vec<u8>> {
        let path = self.artifact_path(id, artifact);
        fs::read(&path).map_err(|e| {
            KernError::Store(format!("no archived copy of {} at {}: {e}", artifact.id, path.display()))
        })
    }
}
