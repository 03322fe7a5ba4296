// src/resource/hash.rs

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::fs::{FileSystem, walk_files};

/// Deterministic digest of a resource's declared content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex chars, for log lines and diagram labels.
    ///
    /// Falls back to the whole string when 12 bytes is not a char boundary.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Which files under a resource directory take part in its hash.
#[derive(Debug, Default)]
pub struct HashSelection {
    /// If non-empty, only files matching one of these globs are hashed.
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

/// Hash every selected file below `root`.
///
/// Each file contributes its path relative to `root` and its own digest, so
/// renames change the hash as well as edits. Files are visited in sorted
/// order to keep the result independent of directory iteration order.
pub fn hash_tree(fs: &dyn FileSystem, root: &Path, selection: &HashSelection) -> Result<ContentHash> {
    let include = build_globset(&selection.include)?;
    let exclude = build_globset(&selection.exclude)?;

    let mut entries: Vec<(String, PathBuf)> = Vec::new();
    for path in walk_files(fs, root)? {
        let rel = relative_key(root, &path);
        if !selection.include.is_empty() && !include.is_match(&rel) {
            continue;
        }
        if exclude.is_match(&rel) {
            trace!(file = %rel, "excluded from resource hash");
            continue;
        }
        entries.push((rel, path));
    }
    entries.sort();

    let mut hasher = Hasher::new();
    for (rel, path) in &entries {
        let file_hash = compute_file_hash(fs, path)?;
        hasher.update(rel.as_bytes());
        hasher.update(&[0]);
        hasher.update(file_hash.as_bytes());
    }

    let hash = ContentHash::new(hasher.finalize().to_hex().to_string());
    debug!(root = ?root, files = entries.len(), hash = %hash.short(), "computed resource hash");
    Ok(hash)
}

/// `/`-separated path of `path` relative to `root`.
fn relative_key(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    builder.build().context("building globset")
}
