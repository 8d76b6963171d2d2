//! Google Kubernetes Engine through `gcloud`.

use std::path::{Path, PathBuf};

use crate::cloud::{ClusterBackend, ProjectIdentity, ProjectResolver};
use crate::core::cloud::{CloudConfig, Provider};
use crate::core::error::{BerthError, BerthResult};
use crate::util::process::{Executor, ProcessBuilder};

/// Region used when neither the cloud config, the berth config nor gcloud
/// name one.
pub const DEFAULT_REGION: &str = "us-central1";

/// Node pool resized by pause/start.
const NODE_POOL: &str = "default-pool";

/// Resolves GCP projects with `gcloud projects describe`.
#[derive(Debug, Clone)]
pub struct GcloudProjects {
    gcloud: PathBuf,
}

impl GcloudProjects {
    pub fn new(gcloud: impl AsRef<Path>) -> Self {
        GcloudProjects {
            gcloud: gcloud.as_ref().to_path_buf(),
        }
    }

    fn configured_region(&self, exec: &mut dyn Executor) -> Option<String> {
        let cmd = ProcessBuilder::new(&self.gcloud).args(["config", "get-value", "compute/region"]);
        match exec.run(&cmd) {
            Ok(output) if output.success() => {
                let region = output.stdout.trim();
                if region.is_empty() || region == "(unset)" {
                    None
                } else {
                    Some(region.to_string())
                }
            }
            Ok(output) => {
                tracing::debug!("no gcloud region: {}", output.diagnostic_output());
                None
            }
            Err(e) => {
                tracing::debug!("no gcloud region: {}", e);
                None
            }
        }
    }
}

impl ProjectResolver for GcloudProjects {
    fn resolve(
        &self,
        desired: &str,
        exec: &mut dyn Executor,
    ) -> BerthResult<Option<ProjectIdentity>> {
        let cmd = ProcessBuilder::new(&self.gcloud)
            .args(["projects", "describe", desired])
            .arg("--format=value(projectId)");
        let output = exec.run(&cmd)?;

        if !output.success() {
            let diagnostic = output.diagnostic_output();
            if is_missing_project(&diagnostic) {
                return Ok(None);
            }
            return Err(BerthError::ExternalFailure {
                command: cmd.display_command(),
                status: output.status,
                output: diagnostic,
            });
        }

        let project = output.stdout.trim();
        if project.is_empty() {
            return Ok(None);
        }
        Ok(Some(ProjectIdentity {
            project: project.to_string(),
            region: self.configured_region(exec),
        }))
    }
}

fn is_missing_project(output: &str) -> bool {
    let output = output.to_lowercase();
    output.contains("not_found")
        || output.contains("not found")
        || output.contains("permission_denied")
        || output.contains("does not have permission")
}

/// GKE cluster commands.
pub struct GcpBackend {
    gcloud: PathBuf,
    resolver: Box<dyn ProjectResolver>,
}

impl GcpBackend {
    pub fn new(gcloud: impl AsRef<Path>) -> Self {
        GcpBackend {
            gcloud: gcloud.as_ref().to_path_buf(),
            resolver: Box::new(GcloudProjects::new(gcloud)),
        }
    }

    /// Use a different project lookup.
    pub fn with_resolver(mut self, resolver: Box<dyn ProjectResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    fn location<'c>(&self, cloud: &'c CloudConfig) -> BerthResult<(&'c str, &'c str)> {
        let project = cloud.project.as_deref().ok_or_else(|| {
            BerthError::Config(
                "gcp project is not set; provision a cluster or set `project` in the [[cloud]] entry"
                    .to_string(),
            )
        })?;
        let region = cloud.region.as_deref().unwrap_or(DEFAULT_REGION);
        Ok((project, region))
    }

    fn clusters_cmd(
        &self,
        cloud: &CloudConfig,
        action: &str,
        cluster: &str,
    ) -> BerthResult<ProcessBuilder> {
        let (project, region) = self.location(cloud)?;
        Ok(ProcessBuilder::new(&self.gcloud)
            .args(["container", "clusters", action, cluster])
            .args(["--project", project, "--region", region]))
    }

    fn resize(&self, cloud: &CloudConfig, cluster: &str, nodes: u32) -> BerthResult<ProcessBuilder> {
        Ok(self
            .clusters_cmd(cloud, "resize", cluster)?
            .args(["--node-pool", NODE_POOL])
            .arg("--num-nodes")
            .arg(nodes.to_string())
            .arg("--quiet"))
    }
}

impl ClusterBackend for GcpBackend {
    fn provider(&self) -> Provider {
        Provider::Gcp
    }

    fn prepare(
        &self,
        cloud: &mut CloudConfig,
        desired_project: &str,
        fallback_region: Option<&str>,
        exec: &mut dyn Executor,
    ) -> BerthResult<()> {
        if cloud.project.is_some() && cloud.region.is_some() {
            return Ok(());
        }

        let desired = cloud.project.as_deref().unwrap_or(desired_project).to_string();
        let identity = self
            .resolver
            .resolve(&desired, exec)?
            .ok_or_else(|| BerthError::not_found("gcp project", desired.as_str()))?;
        tracing::info!("resolved gcp project `{}`", identity.project);

        if cloud.region.is_none() {
            let region = identity
                .region
                .or_else(|| fallback_region.map(str::to_string))
                .unwrap_or_else(|| DEFAULT_REGION.to_string());
            cloud.region = Some(region);
        }
        cloud.project = Some(identity.project);
        Ok(())
    }

    fn provision(
        &self,
        cloud: &CloudConfig,
        cluster: &str,
        node_count: u32,
    ) -> BerthResult<ProcessBuilder> {
        Ok(self
            .clusters_cmd(cloud, "create", cluster)?
            .arg("--num-nodes")
            .arg(node_count.to_string()))
    }

    fn delete(&self, cloud: &CloudConfig, cluster: &str) -> BerthResult<ProcessBuilder> {
        Ok(self.clusters_cmd(cloud, "delete", cluster)?.arg("--quiet"))
    }

    fn pause(&self, cloud: &CloudConfig, cluster: &str) -> BerthResult<ProcessBuilder> {
        self.resize(cloud, cluster, 0)
    }

    fn start(
        &self,
        cloud: &CloudConfig,
        cluster: &str,
        node_count: u32,
    ) -> BerthResult<ProcessBuilder> {
        self.resize(cloud, cluster, node_count)
    }

    fn activate(&self, cloud: &CloudConfig, cluster: &str) -> BerthResult<ProcessBuilder> {
        self.clusters_cmd(cloud, "get-credentials", cluster)
    }

    fn context_name(&self, cloud: &CloudConfig, cluster: &str) -> BerthResult<String> {
        let (project, region) = self.location(cloud)?;
        Ok(format!("gke_{}_{}_{}", project, region, cluster))
    }
}
