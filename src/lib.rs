//! berth - project manifests and deployment orchestration
//!
//! This crate provides the library behind the `berth` CLI: the `Berth.toml`
//! model and its resource/addon graph, environment wiring, the local,
//! compose and helm target compilers, and the per-provider cluster
//! registry with its kube-context switching.

pub mod cloud;
pub mod core;
pub mod ops;
pub mod targets;
pub mod util;
pub mod wiring;

/// Test utilities and mocks for berth unit tests.
///
/// Only compiled for tests. Provides a scripted [`Executor`] and project
/// fixtures.
///
/// [`Executor`]: crate::util::process::Executor
#[cfg(test)]
pub mod test_support;

pub use crate::core::{
    error::{BerthError, BerthResult},
    manifest::Project,
    workspace::Workspace,
};
pub use util::context::GlobalContext;
