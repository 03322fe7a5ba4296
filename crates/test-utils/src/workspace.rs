#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::builders::ResourceBuilder;

/// Temporary directory tree holding resource declarations.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Write `<rel_dir>/resource.toml`; returns the file path.
    pub fn add_resource(&self, rel_dir: &str, resource: &ResourceBuilder) -> std::io::Result<PathBuf> {
        self.write_file(Path::new(rel_dir).join("resource.toml"), resource.to_toml())
    }

    pub fn write_file(&self, rel: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> std::io::Result<PathBuf> {
        let path = self.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn exists(&self, rel: impl AsRef<Path>) -> bool {
        self.join(rel).exists()
    }

    /// Default file store location below the workspace.
    pub fn store_dir(&self) -> PathBuf {
        self.join(".kern/store")
    }
}
