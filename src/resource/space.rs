// src/resource/space.rs

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing::{debug, warn};

use crate::errors::Result;
use crate::fs::{FileSystem, walk_files};
use crate::resource::hash::{ContentHash, HashSelection, hash_tree};
use crate::resource::loader::{get_resource, is_declaration_file};
use crate::resource::model::{Resource, ResourceId};

/// Resolves resource identifiers below a base directory and hashes resources.
///
/// Declarations are discovered by walking the base directory once, on the
/// first lookup; later lookups re-read only the matching file. Hashes are
/// computed once per resource, so files restored from the store during
/// planning do not change a hash already handed out.
pub struct ResourceSpace {
    base: PathBuf,
    fs: Arc<dyn FileSystem>,
    index: OnceLock<HashMap<ResourceId, PathBuf>>,
    hashes: Mutex<HashMap<ResourceId, ContentHash>>,
}

impl fmt::Debug for ResourceSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSpace")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl ResourceSpace {
    pub fn new(base: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            base: base.into(),
            fs,
            index: OnceLock::new(),
            hashes: Mutex::new(HashMap::new()),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Look up a resource by its `Kind:name` id.
    ///
    /// Unknown ids resolve to `Ok(None)`; a malformed id is an error.
    pub fn find_resource_by_id(&self, id: &str) -> Result<Option<Resource>> {
        let id: ResourceId = id.parse()?;
        let Some(file) = self.index().get(&id) else {
            debug!(resource = %id, "resource not found in space");
            return Ok(None);
        };
        get_resource(self.fs.as_ref(), file)
    }

    /// Look up `Env:<name>`.
    pub fn find_env(&self, name: &str) -> Result<Option<Resource>> {
        self.find_resource_by_id(ResourceId::env(name).as_str())
    }

    /// Content hash of `resource`, derived from the files in its directory.
    ///
    /// - Env resources hash their declaration file plus `spec.match`.
    /// - Other resources hash `spec.match` plus the declaration file when
    ///   `match` is given, otherwise every file in the directory.
    /// - `spec.ignore` globs are always excluded.
    pub fn calculate_hash(&self, resource: &Resource) -> Result<ContentHash> {
        let mut hashes = self.hashes.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(hash) = hashes.get(resource.id()) {
            return Ok(hash.clone());
        }
        let hash = self.hash_resource(resource)?;
        hashes.insert(resource.id().clone(), hash.clone());
        Ok(hash)
    }

    fn hash_resource(&self, resource: &Resource) -> Result<ContentHash> {
        let mut include = resource.spec_str_list("match");
        if resource.is_env() || !include.is_empty() {
            if let Some(name) = declaration_key(resource) {
                include.push(name);
            }
        }
        let selection = HashSelection {
            include,
            exclude: resource.spec_str_list("ignore"),
        };
        Ok(hash_tree(self.fs.as_ref(), &resource.dir(), &selection)?)
    }

    fn index(&self) -> &HashMap<ResourceId, PathBuf> {
        self.index.get_or_init(|| self.scan())
    }

    fn scan(&self) -> HashMap<ResourceId, PathBuf> {
        let mut index = HashMap::new();
        let files = match walk_files(self.fs.as_ref(), &self.base) {
            Ok(files) => files,
            Err(err) => {
                warn!(base = ?self.base, error = %err, "could not walk resource space");
                return index;
            }
        };

        for file in files.into_iter().filter(|f| is_declaration_file(f)) {
            match get_resource(self.fs.as_ref(), &file) {
                Ok(Some(res)) => {
                    if let Some(existing) = index.get(res.id()) {
                        warn!(
                            resource = %res.id(),
                            kept = ?existing,
                            ignored = ?file,
                            "duplicate resource id in space"
                        );
                        continue;
                    }
                    index.insert(res.id().clone(), file);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(file = ?file, error = %err, "skipping unreadable resource declaration");
                }
            }
        }

        debug!(base = ?self.base, resources = index.len(), "indexed resource space");
        index
    }
}

/// Declaration file path relative to the resource directory, as a glob.
fn declaration_key(resource: &Resource) -> Option<String> {
    let dir = resource.dir();
    let rel = resource.file().strip_prefix(&dir).ok()?;
    Some(
        rel.components()
            .map(|c| globset::escape(&c.as_os_str().to_string_lossy()))
            .collect::<Vec<_>>()
            .join("/"),
    )
}
