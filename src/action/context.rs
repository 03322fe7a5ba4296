// src/action/context.rs

use std::path::{Path, PathBuf};

use crate::resource::{ContentHash, Resource};
use crate::state::artifact::relative_to;
use crate::state::{Artifact, FILE_KIND, StateSnapshot};

/// Everything a handler gets to see about the node it runs.
///
/// Owned, so it can move onto the blocking pool.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub action: String,
    pub resource: Resource,
    /// Environment resource the node is bound to, if any.
    pub env: Option<Resource>,
    /// Environment name the result is recorded under.
    pub env_name: Option<String>,
    pub hash: ContentHash,
    /// State of the resource before this run.
    pub prior: StateSnapshot,
    pub base: PathBuf,
}

impl ActionContext {
    pub fn resource_dir(&self) -> PathBuf {
        self.resource.dir()
    }

    pub fn env_name(&self) -> Option<&str> {
        self.env_name.as_deref()
    }

    /// A `file` artifact; relative paths are taken from the resource directory.
    pub fn file_artifact(&self, id: impl Into<String>, path: impl AsRef<Path>) -> Artifact {
        let dir = self.resource_dir();
        let path = path.as_ref();
        let full = if path.is_absolute() {
            path.to_path_buf()
        } else {
            dir.join(path)
        };

        Artifact {
            id: id.into(),
            action: self.action.clone(),
            env: self.env_name.clone(),
            hash: self.hash.to_string(),
            kind: FILE_KIND.to_string(),
            relative_path: relative_to(&dir, &full),
            data: full.to_string_lossy().into_owned(),
        }
    }

    /// An artifact of any other kind.
    pub fn artifact(
        &self,
        id: impl Into<String>,
        kind: impl Into<String>,
        data: impl Into<String>,
    ) -> Artifact {
        Artifact {
            id: id.into(),
            action: self.action.clone(),
            env: self.env_name.clone(),
            hash: self.hash.to_string(),
            kind: kind.into(),
            data: data.into(),
            relative_path: String::new(),
        }
    }
}
