#![allow(dead_code)]

use std::path::Path;

use kern::resource::{Resource, ResourceDecl};
use toml::{Table, Value};

/// Builder for `resource.toml` declarations.
#[derive(Debug, Clone)]
pub struct ResourceBuilder {
    kind: String,
    name: String,
    env: Option<String>,
    depends_on: Vec<Table>,
    spec: Table,
}

impl ResourceBuilder {
    pub fn new(kind: &str, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            name: name.to_string(),
            env: None,
            depends_on: Vec::new(),
            spec: Table::new(),
        }
    }

    /// An `Env:<name>` resource.
    pub fn env_resource(name: &str) -> Self {
        Self::new("Env", name)
    }

    /// Bind to `Env:<name>` via `metadata.env`.
    pub fn env(mut self, name: &str) -> Self {
        self.env = Some(name.to_string());
        self
    }

    pub fn depends_on(self, id: &str) -> Self {
        self.depends_on_with(id, None, None)
    }

    pub fn depends_on_with(mut self, id: &str, action1: Option<&str>, action2: Option<&str>) -> Self {
        let mut dep = Table::new();
        dep.insert("id".into(), Value::from(id));
        if let Some(a1) = action1 {
            dep.insert("action1".into(), Value::from(a1));
        }
        if let Some(a2) = action2 {
            dep.insert("action2".into(), Value::from(a2));
        }
        self.depends_on.push(dep);
        self
    }

    pub fn spec(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.spec.insert(key.to_string(), value.into());
        self
    }

    /// `spec.<action> = "<cmd>"` for the shell handler.
    pub fn command(self, action: &str, cmd: &str) -> Self {
        self.spec(action, cmd)
    }

    /// Append a `[[spec.artifacts]]` entry.
    pub fn artifact(mut self, action: &str, path: &str) -> Self {
        let mut entry = Table::new();
        entry.insert("action".into(), Value::from(action));
        entry.insert("path".into(), Value::from(path));
        let artifacts = self
            .spec
            .entry("artifacts")
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = artifacts {
            items.push(Value::Table(entry));
        }
        self
    }

    pub fn id(&self) -> String {
        format!("{}:{}", self.kind, self.name)
    }

    pub fn to_toml(&self) -> String {
        let mut metadata = Table::new();
        metadata.insert("name".into(), Value::from(self.name.as_str()));
        if let Some(env) = &self.env {
            metadata.insert("env".into(), Value::from(env.as_str()));
        }
        if !self.depends_on.is_empty() {
            let deps = self.depends_on.iter().cloned().map(Value::Table).collect();
            metadata.insert("depends_on".into(), Value::Array(deps));
        }

        let mut root = Table::new();
        root.insert("kind".into(), Value::from(self.kind.as_str()));
        root.insert("metadata".into(), Value::Table(metadata));
        root.insert("spec".into(), Value::Table(self.spec.clone()));
        toml::to_string(&root).expect("declaration serialises")
    }

    pub fn decl(&self) -> ResourceDecl {
        toml::from_str(&self.to_toml()).expect("declaration parses")
    }

    /// In-memory resource as if loaded from `file`.
    pub fn build_at(&self, file: impl AsRef<Path>) -> Resource {
        Resource::new(file.as_ref(), self.decl()).expect("valid resource")
    }
}
