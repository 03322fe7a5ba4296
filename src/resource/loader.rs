// src/resource/loader.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{KernError, Result};
use crate::fs::FileSystem;
use crate::resource::model::{Resource, ResourceDecl};

/// Conventional declaration file name looked up inside a resource directory.
pub const RESOURCE_FILE_NAME: &str = "resource.toml";

/// Whether `path` is named like a declaration (`resource*.toml`).
pub fn is_declaration_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("resource") && n.ends_with(".toml"))
}

/// Accept either a declaration file or a directory containing
/// [`RESOURCE_FILE_NAME`].
pub fn resolve_resource_file(fs: &dyn FileSystem, path: &Path) -> Result<PathBuf> {
    if fs.is_dir(path) {
        let candidate = path.join(RESOURCE_FILE_NAME);
        if fs.is_file(&candidate) {
            return Ok(candidate);
        }
        return Err(KernError::Resource(format!(
            "directory {:?} does not contain a {RESOURCE_FILE_NAME}",
            path
        )));
    }
    if fs.is_file(path) {
        return Ok(path.to_path_buf());
    }
    Err(KernError::Resource(format!("resource file {:?} does not exist", path)))
}

/// Parse the declaration at `path`.
///
/// Returns `Ok(None)` when the file is TOML but not a resource declaration
/// (no top-level `kind`).
pub fn get_resource(fs: &dyn FileSystem, path: &Path) -> Result<Option<Resource>> {
    let contents = fs
        .read_to_string(path)
        .map_err(|e| KernError::Resource(format!("{e:#}")))?;
    let table: toml::Table = toml::from_str(&contents)?;
    if !table.contains_key("kind") {
        debug!(file = ?path, "toml file has no `kind`; not a resource declaration");
        return Ok(None);
    }

    let decl: ResourceDecl = toml::from_str(&contents)
        .map_err(|e| KernError::ResourceConfig(format!("invalid resource declaration {:?}: {e}", path)))?;
    Resource::new(path, decl).map(Some)
}

/// Resolve and load a resource the caller requires.
pub fn load_resource(fs: &dyn FileSystem, path: &Path) -> Result<Resource> {
    let file = resolve_resource_file(fs, path)?;
    get_resource(fs, &file)?.ok_or_else(|| {
        KernError::Resource(format!("{:?} is not a recognised resource declaration", file))
    })
}
