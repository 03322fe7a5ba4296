// src/resource/mod.rs

//! Resources: what actions operate on.
//!
//! - [`model`] holds the parsed declaration (`kind`, `metadata`, `spec`) and
//!   the `Kind:name` identifier type.
//! - [`loader`] turns a path into a [`Resource`] (the `get_resource`
//!   boundary).
//! - [`space`] resolves identifiers to resources below a base directory.
//! - [`hash`] computes the content hash used as half of the state cache key.

pub mod hash;
pub mod loader;
pub mod model;
pub mod space;

pub use hash::{ContentHash, compute_file_hash};
pub use loader::{RESOURCE_FILE_NAME, get_resource, load_resource, resolve_resource_file};
pub use model::{DepDecl, ENV_KIND, Metadata, Resource, ResourceDecl, ResourceId, SpecRef};
pub use space::ResourceSpace;
