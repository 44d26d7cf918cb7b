//! groundflow Core
//!
//! This crate provides the declaration layer of groundflow: the KDL
//! manifest format, variable expansion, and the resource dependency
//! graph that the planner and executor operate on.
//!
//! # Pipeline
//!
//! ```text
//! ground.kdl (+ ground.local.kdl)
//!     │  discovery / loader
//!     ▼
//! Manifest { providers, variables, resources }
//!     │  DependencyGraph::build
//!     ▼
//! DAG (topologically orderable, cycle-free)
//! ```
//!
//! Graph construction is a pure transformation: unresolved references
//! and cycles are fatal configuration errors, detected before any
//! provider is contacted.

pub mod discovery;
pub mod error;
pub mod graph;
pub mod loader;
pub mod model;
pub mod parser;
pub mod variables;

// Re-exports
pub use discovery::{DiscoveredFiles, discover_files, find_project_root, find_project_root_from};
pub use error::{ManifestError, Result};
pub use graph::{DependencyGraph, ResourceNode};
pub use loader::{load_project, load_project_from_root, load_project_with_overrides};
pub use model::{
    Address, AttrValue, Manifest, ProviderConfig, ResourceDeclaration, ResourceTypeSchema,
};
pub use parser::{parse_manifest_file, parse_manifest_string};
pub use variables::{expand_variables, extract_variables};
