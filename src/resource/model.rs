// src/resource/model.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{KernError, Result};

/// Kind of the distinguished environment resources (`Env:<name>`).
pub const ENV_KIND: &str = "Env";

/// References inside spec values: `$<Kind>:<name>.<action>.<key>`.
static SPEC_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$([^.\s]+:[^.\s]+)\.([^.\s]+)\.(.+)$").expect("spec reference pattern is valid")
});

/// A parsed `$<Kind>:<name>.<action>.<key>` reference: output `key` of the
/// result `action` produced for resource `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRef {
    pub id: String,
    pub action: String,
    pub key: String,
}

impl SpecRef {
    /// `None` unless the whole of `s` is a reference.
    pub fn parse(s: &str) -> Option<Self> {
        let caps = SPEC_REF.captures(s)?;
        Some(Self {
            id: caps[1].to_string(),
            action: caps[2].to_string(),
            key: caps[3].to_string(),
        })
    }
}

/// Stable `Kind:name` identifier of a resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(kind: &str, name: &str) -> Self {
        Self(format!("{kind}:{name}"))
    }

    /// The environment id for a bare env name.
    pub fn env(name: &str) -> Self {
        Self::new(ENV_KIND, name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> &str {
        self.0.split_once(':').map(|(k, _)| k).unwrap_or(&self.0)
    }

    pub fn name(&self) -> &str {
        self.0.split_once(':').map(|(_, n)| n).unwrap_or("")
    }
}

impl FromStr for ResourceId {
    type Err = KernError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 2 || parts.iter().any(|p| p.trim().is_empty()) {
            return Err(KernError::Resource(format!("Invalid resource ID: {s}")));
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of `metadata.depends_on`.
///
/// - `action1`: the dependency only applies when the requested action is at
///   or after this one in the lifecycle.
/// - `action2`: the action required of the dependency (defaults to the
///   requested action).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DepDecl {
    pub id: String,
    #[serde(default)]
    pub action1: Option<String>,
    #[serde(default)]
    pub action2: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub name: String,
    /// Name of the environment this resource is bound to.
    #[serde(default)]
    pub env: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<DepDecl>,
}

/// A resource declaration as written on disk.
///
/// ```toml
/// kind = "Shell"
/// [metadata]
/// name = "api"
/// env = "dev"
/// depends_on = [{ id = "Shell:lib", action2 = "build" }]
/// [spec]
/// build = "cargo build"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDecl {
    pub kind: String,
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: toml::Table,
}

/// A loaded resource: its declaration plus where it was loaded from.
#[derive(Debug, Clone)]
pub struct Resource {
    id: ResourceId,
    file: PathBuf,
    decl: ResourceDecl,
}

impl Resource {
    pub fn new(file: impl Into<PathBuf>, decl: ResourceDecl) -> Result<Self> {
        let file = file.into();
        for (what, value) in [("kind", &decl.kind), ("metadata.name", &decl.metadata.name)] {
            if value.trim().is_empty() || value.contains(':') {
                return Err(KernError::ResourceConfig(format!(
                    "{what} must be non-empty and must not contain ':' (found {value:?} in {file:?})"
                )));
            }
        }
        Ok(Self {
            id: ResourceId::new(&decl.kind, &decl.metadata.name),
            file,
            decl,
        })
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.decl.kind
    }

    pub fn name(&self) -> &str {
        &self.decl.metadata.name
    }

    pub fn is_env(&self) -> bool {
        self.decl.kind == ENV_KIND
    }

    /// The declaration file this resource was loaded from.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Directory the resource's content lives in (`spec.path`, relative to
    /// the declaration file).
    pub fn dir(&self) -> PathBuf {
        let parent = self.file.parent().unwrap_or(Path::new("."));
        match self.spec_str("path") {
            Some(p) if p != "." => parent.join(p),
            _ => parent.to_path_buf(),
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.decl.metadata
    }

    /// Environment name bound via `metadata.env`.
    pub fn env_name(&self) -> Option<&str> {
        self.decl.metadata.env.as_deref()
    }

    pub fn spec(&self) -> &toml::Table {
        &self.decl.spec
    }

    pub fn spec_value(&self, key: &str) -> Option<&toml::Value> {
        self.decl.spec.get(key)
    }

    pub fn spec_str(&self, key: &str) -> Option<&str> {
        self.spec_value(key).and_then(|v| v.as_str())
    }

    /// A spec key holding a list of strings; non-string items are ignored.
    pub fn spec_str_list(&self, key: &str) -> Vec<String> {
        self.spec_value(key)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether environment dependencies apply to this resource.
    pub fn depends_on_env(&self) -> bool {
        self.spec_value("depends_on_env")
            .and_then(|v| v.as_bool())
            .unwrap_or(true)
    }

    /// Explicit `metadata.depends_on`, first entry per id wins.
    pub fn declared_deps(&self) -> Vec<DepDecl> {
        let mut seen = Vec::new();
        let mut deps = Vec::new();
        for dep in &self.decl.metadata.depends_on {
            if seen.contains(&dep.id) {
                continue;
            }
            seen.push(dep.id.clone());
            deps.push(dep.clone());
        }
        deps
    }

    /// Dependencies implied by `$Kind:name.action.key` references anywhere in
    /// the `spec` table (keys and values, nested tables and arrays included).
    pub fn spec_deps(&self) -> Vec<DepDecl> {
        let mut deps = Vec::new();
        collect_table_refs(&self.decl.spec, &mut deps);
        deps
    }

    /// A copy whose `spec` values that are whole references are replaced by
    /// what `lookup` returns for them. Keys are left alone.
    pub fn with_resolved_spec<F>(&self, mut lookup: F) -> Result<Resource>
    where
        F: FnMut(&SpecRef) -> Result<toml::Value>,
    {
        let mut resolved = self.clone();
        resolve_table(&mut resolved.decl.spec, &mut lookup)?;
        Ok(resolved)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}

fn collect_table_refs(table: &toml::Table, deps: &mut Vec<DepDecl>) {
    for (key, value) in table {
        collect_str_ref(key, deps);
        collect_value_refs(value, deps);
    }
}

fn collect_value_refs(value: &toml::Value, deps: &mut Vec<DepDecl>) {
    match value {
        toml::Value::String(s) => collect_str_ref(s, deps),
        toml::Value::Array(items) => {
            for item in items {
                collect_value_refs(item, deps);
            }
        }
        toml::Value::Table(t) => collect_table_refs(t, deps),
        _ => {}
    }
}

fn collect_str_ref(s: &str, deps: &mut Vec<DepDecl>) {
    if let Some(r) = SpecRef::parse(s) {
        deps.push(DepDecl {
            id: r.id,
            action1: None,
            action2: Some(r.action),
        });
    }
}

fn resolve_table<F>(table: &mut toml::Table, lookup: &mut F) -> Result<()>
where
    F: FnMut(&SpecRef) -> Result<toml::Value>,
{
    for (_, value) in table.iter_mut() {
        resolve_value(value, lookup)?;
    }
    Ok(())
}

fn resolve_value<F>(value: &mut toml::Value, lookup: &mut F) -> Result<()>
where
    F: FnMut(&SpecRef) -> Result<toml::Value>,
{
    match value {
        toml::Value::String(s) => {
            if let Some(r) = SpecRef::parse(s) {
                *value = lookup(&r)?;
            }
        }
        toml::Value::Array(items) => {
            for item in items {
                resolve_value(item, lookup)?;
            }
        }
        toml::Value::Table(t) => resolve_table(t, lookup)?,
        _ => {}
    }
    Ok(())
}
