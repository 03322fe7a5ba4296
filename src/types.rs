// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Which execution strategy drives the plan graph.
///
/// - `Serial`: one node at a time, in dependency order (default).
/// - `Parallel`: independent branches run concurrently, bounded by
///   `[executor].max_parallel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    #[default]
    Serial,
    Parallel,
}

impl FromStr for ExecutorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "serial" => Ok(ExecutorKind::Serial),
            "parallel" => Ok(ExecutorKind::Parallel),
            other => Err(format!(
                "invalid executor kind: {other} (expected \"serial\" or \"parallel\")"
            )),
        }
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorKind::Serial => f.write_str("SerialExecutor"),
            ExecutorKind::Parallel => f.write_str("ParallelExecutor"),
        }
    }
}

/// Backend used for persisting resource states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// JSON files under `<output>/<organization>/<project>/`.
    #[default]
    File,
    /// In-process only (lost on exit).
    Memory,
}
