//! Cloud backends.
//!
//! A [`ClusterBackend`] knows how to turn a cluster lifecycle step for one
//! provider into the command its CLI expects. Bookkeeping of which clusters
//! exist lives in [`CloudConfig`]; backends never touch the manifest.

pub mod context;
pub mod digitalocean;
pub mod gcp;

use crate::core::cloud::{CloudConfig, Provider};
use crate::core::error::BerthResult;
use crate::util::config::Tools;
use crate::util::process::{Executor, ProcessBuilder};

pub use context::ContextSwitcher;
pub use digitalocean::DigitalOceanBackend;
pub use gcp::{GcloudProjects, GcpBackend};

/// The kube context a batch of cluster commands runs against.
///
/// Always passed explicitly; nothing in berth reads a "current" context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterContext {
    pub provider: Provider,

    /// Cluster name as recorded in the manifest
    pub cluster: String,

    /// Context name in the kubeconfig
    pub name: String,
}

/// A cloud project resolved from a desired name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectIdentity {
    pub project: String,

    /// Default region configured for the project, if any
    pub region: Option<String>,
}

/// Looks up cloud projects by name.
pub trait ProjectResolver {
    /// Resolve `desired`. `Ok(None)` means the project does not exist or is
    /// not visible to the current credentials.
    fn resolve(
        &self,
        desired: &str,
        exec: &mut dyn Executor,
    ) -> BerthResult<Option<ProjectIdentity>>;
}

/// Provider-specific cluster commands.
pub trait ClusterBackend {
    fn provider(&self) -> Provider;

    /// Fill in whatever the provider needs before the first provision
    /// (project id, region).
    fn prepare(
        &self,
        cloud: &mut CloudConfig,
        desired_project: &str,
        fallback_region: Option<&str>,
        exec: &mut dyn Executor,
    ) -> BerthResult<()>;

    fn provision(
        &self,
        cloud: &CloudConfig,
        cluster: &str,
        node_count: u32,
    ) -> BerthResult<ProcessBuilder>;

    fn delete(&self, cloud: &CloudConfig, cluster: &str) -> BerthResult<ProcessBuilder>;

    /// Scale the cluster to zero nodes.
    fn pause(&self, cloud: &CloudConfig, cluster: &str) -> BerthResult<ProcessBuilder>;

    /// Scale a paused cluster back up.
    fn start(
        &self,
        cloud: &CloudConfig,
        cluster: &str,
        node_count: u32,
    ) -> BerthResult<ProcessBuilder>;

    /// Write credentials for `cluster` into the kubeconfig.
    fn activate(&self, cloud: &CloudConfig, cluster: &str) -> BerthResult<ProcessBuilder>;

    /// Name of the kubeconfig context `activate` creates.
    fn context_name(&self, cloud: &CloudConfig, cluster: &str) -> BerthResult<String>;
}

/// The backend for `provider`, driving the configured program.
pub fn backend(provider: Provider, tools: &Tools) -> Box<dyn ClusterBackend> {
    match provider {
        Provider::Gcp => Box::new(GcpBackend::new(&tools.gcloud)),
        Provider::Digitalocean => Box::new(DigitalOceanBackend::new(&tools.doctl)),
    }
}
