// src/state/artifact.rs

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Artifact kind for produced files; these are swept after every run.
pub const FILE_KIND: &str = "file";

/// A side effect produced by an action and recorded in its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub action: String,
    #[serde(default)]
    pub env: Option<String>,
    /// Content hash of the resource when the artifact was produced.
    pub hash: String,
    pub kind: String,
    /// Payload; an absolute or workspace path for `file` artifacts.
    pub data: String,
    /// For files: path relative to the resource directory.
    #[serde(default)]
    pub relative_path: String,
}

impl Artifact {
    pub fn is_file(&self) -> bool {
        self.kind == FILE_KIND
    }

    /// Filesystem path of a `file` artifact.
    pub fn path(&self) -> Option<PathBuf> {
        self.is_file().then(|| PathBuf::from(&self.data))
    }

    /// Relative location of the archived copy inside a resource's store
    /// directory: `<hash>/<action>/<env or _>/<relative path>`.
    ///
    /// Only plain path components survive, so the key never leaves the
    /// directory it is joined to.
    pub fn archive_key(&self) -> PathBuf {
        let mut key = PathBuf::from(&self.hash);
        key.push(&self.action);
        key.push(self.env.as_deref().unwrap_or("_"));

        let rel = if self.relative_path.is_empty() {
            Path::new(&self.id)
        } else {
            Path::new(&self.relative_path)
        };
        let mut pushed = false;
        for component in rel.components() {
            if let Component::Normal(part) = component {
                key.push(part);
                pushed = true;
            }
        }
        if !pushed {
            key.push("artifact");
        }
        key
    }
}

/// `data` relative to `resource_dir`, falling back to the file name.
pub(crate) fn relative_to(resource_dir: &Path, data: &Path) -> String {
    match data.strip_prefix(resource_dir) {
        Ok(rel) => rel.to_string_lossy().into_owned(),
        Err(_) => data
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}
