// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::ExecutorKind;

/// Command-line arguments for `kern`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "kern",
    version,
    about = "Run actions on resources, re-running only what changed.",
    long_about = None
)]
pub struct CliArgs {
    /// Resource declaration file, or a directory containing `resource.toml`.
    #[arg(value_name = "RESOURCE")]
    pub resource: PathBuf,

    /// Action to run (build, test, publish, deploy).
    #[arg(value_name = "ACTION")]
    pub action: String,

    /// Environment to run in (resolved as `Env:<NAME>`).
    #[arg(long, value_name = "NAME")]
    pub env: Option<String>,

    /// Root of the resource space.
    ///
    /// Default: the directory containing the resource declaration.
    #[arg(long, value_name = "DIR")]
    pub base_path: Option<PathBuf>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Kern.toml` in the base path; defaults apply if it is absent.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write the plan as a DOT diagram to this path instead of executing.
    #[arg(long, value_name = "PATH")]
    pub plan_file: Option<PathBuf>,

    /// Override `[executor].kind` from the config.
    #[arg(long, value_enum, value_name = "KIND")]
    pub executor: Option<ExecutorArg>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `KERN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Executor kind as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum ExecutorArg {
    Serial,
    Parallel,
}

impl From<ExecutorArg> for ExecutorKind {
    fn from(arg: ExecutorArg) -> Self {
        match arg {
            ExecutorArg::Serial => ExecutorKind::Serial,
            ExecutorArg::Parallel => ExecutorKind::Parallel,
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
