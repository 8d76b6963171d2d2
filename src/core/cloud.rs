//! Per-provider cluster bookkeeping.
//!
//! A [`CloudConfig`] records which clusters exist for one provider and which
//! of them is the main (deployment) cluster. The state machine per cluster is
//!
//! ```text
//! nonexistent -> provisioned(running) <-> paused -> deleted
//! ```
//!
//! Only the bookkeeping lives here; the commands that actually create or
//! resize clusters are produced by [`crate::cloud`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::{BerthError, BerthResult};

/// Supported cloud providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google Kubernetes Engine
    #[default]
    Gcp,
    /// DigitalOcean Kubernetes
    #[serde(alias = "do")]
    Digitalocean,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gcp => "gcp",
            Provider::Digitalocean => "digitalocean",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gcp" | "gke" | "google" => Ok(Provider::Gcp),
            "digitalocean" | "do" | "doks" => Ok(Provider::Digitalocean),
            _ => Err(format!(
                "invalid provider '{}'; expected 'gcp' or 'digitalocean'",
                s
            )),
        }
    }
}

/// Lifecycle state of a known cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterState {
    Running,
    Paused,
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterState::Running => write!(f, "running"),
            ClusterState::Paused => write!(f, "paused"),
        }
    }
}

/// Cluster registry for one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudConfig {
    pub provider: Provider,

    /// Provider project identifier (GCP project id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Known clusters in provisioning order
    #[serde(default)]
    pub clusters: Vec<String>,

    /// Designated main cluster, empty when none
    #[serde(default)]
    pub main: String,

    /// Clusters currently scaled to zero
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paused: Vec<String>,
}

impl CloudConfig {
    pub fn new(provider: Provider) -> Self {
        CloudConfig {
            provider,
            ..Default::default()
        }
    }

    pub fn contains(&self, cluster: &str) -> bool {
        self.clusters.iter().any(|c| c == cluster)
    }

    /// The main cluster, if one is designated.
    pub fn main_cluster(&self) -> Option<&str> {
        if self.main.is_empty() {
            None
        } else {
            Some(&self.main)
        }
    }

    pub fn state(&self, cluster: &str) -> Option<ClusterState> {
        if !self.contains(cluster) {
            None
        } else if self.paused.iter().any(|c| c == cluster) {
            Some(ClusterState::Paused)
        } else {
            Some(ClusterState::Running)
        }
    }

    fn require(&self, cluster: &str) -> BerthResult<()> {
        if self.contains(cluster) {
            Ok(())
        } else {
            Err(BerthError::not_found("cluster", cluster))
        }
    }

    /// Check a provision request without recording anything.
    pub fn check_provision(&self, cluster: &str) -> BerthResult<()> {
        if self.contains(cluster) {
            return Err(BerthError::conflict(format!(
                "cluster `{}` is already provisioned for {}",
                cluster, self.provider
            )));
        }
        Ok(())
    }

    /// Record a newly provisioned cluster. The first cluster becomes main.
    pub fn record_provisioned(&mut self, cluster: &str) -> BerthResult<()> {
        self.check_provision(cluster)?;
        self.clusters.push(cluster.to_string());
        if self.main.is_empty() {
            self.main = cluster.to_string();
        }
        tracing::info!("{}: provisioned cluster `{}` (main: `{}`)", self.provider, cluster, self.main);
        Ok(())
    }

    /// Record a deleted cluster, re-designating main if needed.
    ///
    /// The new main cluster is the first remaining name in list order.
    pub fn record_deleted(&mut self, cluster: &str) -> BerthResult<()> {
        self.require(cluster)?;
        self.clusters.retain(|c| c != cluster);
        self.paused.retain(|c| c != cluster);
        if self.main == cluster {
            self.main = self.clusters.first().cloned().unwrap_or_default();
            tracing::info!(
                "{}: main cluster deleted, main is now `{}`",
                self.provider,
                self.main
            );
        }
        Ok(())
    }

    /// Check that a cluster can be paused.
    pub fn check_pause(&self, cluster: &str) -> BerthResult<()> {
        match self.state(cluster) {
            None => Err(BerthError::not_found("cluster", cluster)),
            Some(ClusterState::Paused) => Err(BerthError::conflict(format!(
                "cluster `{}` is already paused",
                cluster
            ))),
            Some(ClusterState::Running) => Ok(()),
        }
    }

    pub fn record_paused(&mut self, cluster: &str) -> BerthResult<()> {
        self.check_pause(cluster)?;
        self.paused.push(cluster.to_string());
        Ok(())
    }

    /// Check that a cluster can be started.
    pub fn check_start(&self, cluster: &str) -> BerthResult<()> {
        match self.state(cluster) {
            None => Err(BerthError::not_found("cluster", cluster)),
            Some(ClusterState::Running) => Err(BerthError::conflict(format!(
                "cluster `{}` is already running",
                cluster
            ))),
            Some(ClusterState::Paused) => Ok(()),
        }
    }

    pub fn record_started(&mut self, cluster: &str) -> BerthResult<()> {
        self.check_start(cluster)?;
        self.paused.retain(|c| c != cluster);
        Ok(())
    }

    /// Explicitly designate a known cluster as main.
    pub fn set_main(&mut self, cluster: &str) -> BerthResult<()> {
        self.require(cluster)?;
        self.main = cluster.to_string();
        Ok(())
    }

    /// Check the registry invariants.
    pub fn validate(&self) -> BerthResult<()> {
        for (i, cluster) in self.clusters.iter().enumerate() {
            if self.clusters[..i].contains(cluster) {
                return Err(BerthError::integrity(format!(
                    "{}: cluster `{}` is listed twice",
                    self.provider, cluster
                )));
            }
        }
        if !self.main.is_empty() && !self.contains(&self.main) {
            return Err(BerthError::integrity(format!(
                "{}: main cluster `{}` is not in the cluster list",
                self.provider, self.main
            )));
        }
        if let Some(stray) = self.paused.iter().find(|c| !self.contains(c)) {
            return Err(BerthError::integrity(format!(
                "{}: paused cluster `{}` is not in the cluster list",
                self.provider, stray
            )));
        }
        Ok(())
    }
}
