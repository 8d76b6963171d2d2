//! DigitalOcean Kubernetes through `doctl`.
//!
//! DOKS has no way to scale a cluster to zero, so pause and start are
//! reported as unsupported.

use std::path::{Path, PathBuf};

use crate::cloud::ClusterBackend;
use crate::core::cloud::{CloudConfig, Provider};
use crate::core::error::{BerthError, BerthResult};
use crate::util::process::{Executor, ProcessBuilder};

pub const DEFAULT_REGION: &str = "nyc1";

/// DOKS cluster commands.
#[derive(Debug, Clone)]
pub struct DigitalOceanBackend {
    doctl: PathBuf,
}

impl DigitalOceanBackend {
    pub fn new(doctl: impl AsRef<Path>) -> Self {
        DigitalOceanBackend {
            doctl: doctl.as_ref().to_path_buf(),
        }
    }

    fn cluster_cmd(&self) -> ProcessBuilder {
        ProcessBuilder::new(&self.doctl).args(["kubernetes", "cluster"])
    }

    fn unsupported(&self, operation: &'static str) -> BerthError {
        BerthError::UnsupportedOperation {
            provider: self.provider().to_string(),
            operation,
        }
    }
}

fn region(cloud: &CloudConfig) -> &str {
    cloud.region.as_deref().unwrap_or(DEFAULT_REGION)
}

impl ClusterBackend for DigitalOceanBackend {
    fn provider(&self) -> Provider {
        Provider::Digitalocean
    }

    fn prepare(
        &self,
        cloud: &mut CloudConfig,
        _desired_project: &str,
        fallback_region: Option<&str>,
        _exec: &mut dyn Executor,
    ) -> BerthResult<()> {
        if cloud.region.is_none() {
            cloud.region = Some(fallback_region.unwrap_or(DEFAULT_REGION).to_string());
        }
        Ok(())
    }

    fn provision(
        &self,
        cloud: &CloudConfig,
        cluster: &str,
        node_count: u32,
    ) -> BerthResult<ProcessBuilder> {
        Ok(self
            .cluster_cmd()
            .args(["create", cluster, "--region", region(cloud)])
            .arg("--count")
            .arg(node_count.to_string()))
    }

    fn delete(&self, _cloud: &CloudConfig, cluster: &str) -> BerthResult<ProcessBuilder> {
        Ok(self.cluster_cmd().args(["delete", cluster, "--force"]))
    }

    fn pause(&self, _cloud: &CloudConfig, _cluster: &str) -> BerthResult<ProcessBuilder> {
        Err(self.unsupported("pause"))
    }

    fn start(
        &self,
        _cloud: &CloudConfig,
        _cluster: &str,
        _node_count: u32,
    ) -> BerthResult<ProcessBuilder> {
        Err(self.unsupported("start"))
    }

    fn activate(&self, _cloud: &CloudConfig, cluster: &str) -> BerthResult<ProcessBuilder> {
        Ok(self.cluster_cmd().args(["kubeconfig", "save", cluster]))
    }

    fn context_name(&self, cloud: &CloudConfig, cluster: &str) -> BerthResult<String> {
        Ok(format!("do-{}-{}", region(cloud), cluster))
    }
}
