// src/diagram.rs

//! Rendering of plan edges as a Graphviz `digraph`.

use std::fmt::Write as _;
use std::path::Path;

use tracing::info;

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::plan::NodeKey;

/// Read-only consumer of plan edges.
pub trait DiagramExporter {
    fn render(&self, edges: &[(NodeKey, NodeKey)], title: &str) -> String;

    /// Render and write to `path`, creating missing parent directories.
    fn export(
        &self,
        fs: &dyn FileSystem,
        edges: &[(NodeKey, NodeKey)],
        title: &str,
        path: &Path,
    ) -> Result<()> {
        fs.write(path, self.render(edges, title).as_bytes())?;
        info!(path = %path.display(), edges = edges.len(), "wrote plan diagram");
        Ok(())
    }
}

/// DOT output, one `"a" -> "b";` line per edge.
#[derive(Debug, Default, Clone, Copy)]
pub struct DotExporter;

impl DiagramExporter for DotExporter {
    fn render(&self, edges: &[(NodeKey, NodeKey)], title: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "digraph \"{}\" {{", escape(title));
        for (from, to) in edges {
            let _ = writeln!(out, "    \"{}\" -> \"{}\";", escape(from.as_str()), escape(to.as_str()));
        }
        out.push_str("}\n");
        out
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Parse the edges back out of [`DotExporter`] output.
pub fn parse_dot_edges(dot: &str) -> Vec<(NodeKey, NodeKey)> {
    dot.lines()
        .filter_map(|line| {
            let line = line.trim().strip_suffix(';')?;
            let (from, to) = line.split_once(" -> ")?;
            Some((
                NodeKey::from(unquote(from)?.as_str()),
                NodeKey::from(unquote(to)?.as_str()),
            ))
        })
        .collect()
}

fn unquote(s: &str) -> Option<String> {
    let inner = s.trim().strip_prefix('"')?.strip_suffix('"')?;
    Some(inner.replace("\\\"", "\"").replace("\\\\", "\\"))
}
