//! Core data structures for berth.
//!
//! - The project manifest (`Berth.toml`) and its entities
//! - The resource/addon dependency graph
//! - Per-provider cluster registries
//! - Workspace discovery and atomic manifest updates

pub mod addon;
pub mod cloud;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod resource;
pub mod workspace;

pub use addon::{Addon, AddonDatabase};
pub use cloud::{CloudConfig, ClusterState, Provider};
pub use error::{BerthError, BerthResult, ErrorKind};
pub use graph::{DependencyGraph, Node};
pub use manifest::Project;
pub use resource::{DatabaseEngine, Resource, ResourceKind};
pub use workspace::{Workspace, COMPOSE_FILE, MANIFEST_NAME};
