// src/fs/mock.rs

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, bail};

use super::FileSystem;

#[derive(Debug, Default)]
struct Tree {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

impl Tree {
    /// Register `dir` and all of its ancestors.
    fn add_dirs(&mut self, dir: &Path) {
        for ancestor in dir.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            if !self.dirs.insert(ancestor.to_path_buf()) {
                break;
            }
        }
    }
}

/// In-memory filesystem for hashing and discovery tests.
///
/// Paths are compared verbatim, so a test should spell them one way
/// throughout (`ws/a/...`, never `./ws/a/...` as well). Clones share the
/// same tree.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    tree: Arc<Mutex<Tree>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create or replace a file, adding its parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref();
        let mut tree = self.lock();
        if let Some(parent) = path.parent() {
            tree.add_dirs(parent);
        }
        tree.files.insert(path.to_path_buf(), content.into());
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.lock().add_dirs(path.as_ref());
    }

    fn contents(&self, path: &Path) -> Result<Vec<u8>> {
        let tree = self.lock();
        match tree.files.get(path) {
            Some(content) => Ok(content.clone()),
            None if tree.dirs.contains(path) => bail!("{} is a directory", path.display()),
            None => bail!("{} not found", path.display()),
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        Ok(String::from_utf8(self.contents(path)?)?)
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.contents(path)?)))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        if self.lock().files.remove(path).is_none() {
            bail!("{} is not a file", path.display());
        }
        Ok(())
    }

    fn is_file(&self, path: &Path) -> bool {
        self.lock().files.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        is_root(path) || self.lock().dirs.contains(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        if !self.is_dir(path) {
            bail!("{} is not a directory", path.display());
        }
        let tree = self.lock();
        let is_child = |p: &&PathBuf| {
            !is_root(p)
                && p.parent()
                    .is_some_and(|parent| parent == path || (is_root(parent) && is_root(path)))
        };
        Ok(tree
            .dirs
            .iter()
            .filter(is_child)
            .chain(tree.files.keys().filter(is_child))
            .cloned()
            .collect())
    }
}

/// `""` and `"."` both name the working directory.
fn is_root(path: &Path) -> bool {
    path.as_os_str().is_empty() || path == Path::new(".")
}
