//! Activating the main cluster before a batch of cluster commands.

use crate::cloud::{ClusterBackend, ClusterContext};
use crate::core::cloud::{CloudConfig, ClusterState};
use crate::core::error::{BerthError, BerthResult};
use crate::core::manifest::Project;
use crate::util::process::Executor;

/// Resolves and activates a provider's main cluster.
pub struct ContextSwitcher<'a> {
    backend: &'a dyn ClusterBackend,
}

impl<'a> ContextSwitcher<'a> {
    pub fn new(backend: &'a dyn ClusterBackend) -> Self {
        ContextSwitcher { backend }
    }

    /// The context of the main cluster, without running anything.
    pub fn resolve(&self, project: &Project) -> BerthResult<ClusterContext> {
        let (cloud, main) = self.main_cluster(project)?;
        if cloud.state(main) == Some(ClusterState::Paused) {
            tracing::warn!("main cluster `{}` is paused; start it before deploying", main);
        }

        Ok(ClusterContext {
            provider: self.backend.provider(),
            cluster: main.to_string(),
            name: self.backend.context_name(cloud, main)?,
        })
    }

    /// Fetch credentials for the main cluster and return its context.
    pub fn activate(
        &self,
        project: &Project,
        exec: &mut dyn Executor,
    ) -> BerthResult<ClusterContext> {
        let context = self.resolve(project)?;
        let (cloud, main) = self.main_cluster(project)?;
        exec.run_checked(&self.backend.activate(cloud, main)?)?;
        tracing::info!("activated cluster context `{}`", context.name);
        Ok(context)
    }

    fn main_cluster<'p>(&self, project: &'p Project) -> BerthResult<(&'p CloudConfig, &'p str)> {
        let provider = self.backend.provider();
        let missing = || BerthError::MissingMainCluster {
            provider: provider.to_string(),
        };

        let cloud = project.cloud(provider).ok_or_else(missing)?;
        let main = cloud.main_cluster().ok_or_else(missing)?;
        if !cloud.contains(main) {
            return Err(BerthError::integrity(format!(
                "main cluster `{}` is not a known {} cluster",
                main, provider
            )));
        }
        Ok((cloud, main))
    }
}
