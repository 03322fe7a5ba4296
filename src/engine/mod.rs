// src/engine/mod.rs

//! Orchestration of one request: load the resource, plan, then either
//! export the plan diagram or execute it, persisting states and sweeping
//! file artifacts afterwards whatever the outcome.

pub mod cleanup;
pub mod orchestrator;
pub mod request;

pub use cleanup::{finalize, sweep_file_artifacts};
pub use orchestrator::{main_action, main_action_with_fs};
pub use request::ActionRequest;
