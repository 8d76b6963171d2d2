//! High-level operations.
//!
//! This module contains the implementation of berth commands. Every
//! mutating operation goes through [`Workspace::update`], so a failed step
//! never leaves `Berth.toml` half-written.
//!
//! [`Workspace::update`]: crate::core::workspace::Workspace::update

pub mod berth_addon;
pub mod berth_cluster;
pub mod berth_deploy;
pub mod berth_init;
pub mod berth_resource;
pub mod berth_run;
pub mod events;

pub use berth_addon::{attach, detach, disable_addon, enable_addon, EnableAddonOptions};
pub use berth_cluster::{list_clusters, ClusterChange, ClusterEntry};
pub use berth_deploy::{deploy, undeploy, DeployOptions};
pub use berth_init::{init_project, InitOptions};
pub use berth_resource::{add_resource, remove_resource, AddResourceOptions};
pub use berth_run::{resolve_env, run, RunOptions};
pub use berth_test::{test, TestOptions, TestReport};
pub use events::{BatchEvent, BatchReport, EventSink};
