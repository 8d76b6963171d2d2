//! Implementation of `berth cluster` subcommands.
//!
//! Every lifecycle step checks the registry first, then runs the provider
//! command, then records the transition. A failed command leaves the
//! manifest untouched.

use crate::cloud::ClusterBackend;
use crate::core::cloud::{CloudConfig, ClusterState};
use crate::core::error::{BerthError, BerthResult};
use crate::core::workspace::Workspace;
use crate::util::process::Executor;

/// Result of a lifecycle step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterChange {
    pub cluster: String,

    /// Main cluster after the change (empty when none)
    pub main: String,
}

fn registry(ws: &Workspace, backend: &dyn ClusterBackend) -> CloudConfig {
    let provider = backend.provider();
    ws.project()
        .cloud(provider)
        .cloned()
        .unwrap_or_else(|| CloudConfig::new(provider))
}

fn existing_registry(ws: &Workspace, backend: &dyn ClusterBackend, cluster: &str) -> BerthResult<CloudConfig> {
    ws.project()
        .cloud(backend.provider())
        .cloned()
        .ok_or_else(|| BerthError::not_found("cluster", cluster))
}

fn commit(ws: &mut Workspace, cloud: CloudConfig, cluster: &str) -> BerthResult<ClusterChange> {
    let change = ClusterChange {
        cluster: cluster.to_string(),
        main: cloud.main.clone(),
    };
    let provider = cloud.provider;
    ws.update(|project| {
        *project.cloud_mut(provider) = cloud;
        Ok(())
    })?;
    Ok(change)
}

/// Create a cluster. The first cluster of a provider becomes main.
pub fn provision(
    ws: &mut Workspace,
    backend: &dyn ClusterBackend,
    cluster: &str,
    exec: &mut dyn Executor,
) -> BerthResult<ClusterChange> {
    let mut cloud = registry(ws, backend);
    cloud.check_provision(cluster)?;

    let config = ws.config();
    backend.prepare(
        &mut cloud,
        ws.project().name(),
        config.deploy.region.as_deref(),
        exec,
    )?;
    exec.run_checked(&backend.provision(&cloud, cluster, config.node_count())?)?;

    cloud.record_provisioned(cluster)?;
    commit(ws, cloud, cluster)
}

/// Delete a cluster. Deleting main promotes the next remaining cluster.
pub fn delete(
    ws: &mut Workspace,
    backend: &dyn ClusterBackend,
    cluster: &str,
    exec: &mut dyn Executor,
) -> BerthResult<ClusterChange> {
    let mut cloud = existing_registry(ws, backend, cluster)?;
    let cmd = backend.delete(&cloud, cluster)?;
    cloud.record_deleted(cluster)?;

    exec.run_checked(&cmd)?;
    commit(ws, cloud, cluster)
}

/// Scale a running cluster to zero.
pub fn pause(
    ws: &mut Workspace,
    backend: &dyn ClusterBackend,
    cluster: &str,
    exec: &mut dyn Executor,
) -> BerthResult<ClusterChange> {
    let mut cloud = existing_registry(ws, backend, cluster)?;
    cloud.check_pause(cluster)?;
    let cmd = backend.pause(&cloud, cluster)?;

    exec.run_checked(&cmd)?;
    cloud.record_paused(cluster)?;
    commit(ws, cloud, cluster)
}

/// Scale a paused cluster back to the configured node count.
pub fn start(
    ws: &mut Workspace,
    backend: &dyn ClusterBackend,
    cluster: &str,
    exec: &mut dyn Executor,
) -> BerthResult<ClusterChange> {
    let mut cloud = existing_registry(ws, backend, cluster)?;
    cloud.check_start(cluster)?;
    let cmd = backend.start(&cloud, cluster, ws.config().node_count())?;

    exec.run_checked(&cmd)?;
    cloud.record_started(cluster)?;
    commit(ws, cloud, cluster)
}

/// Designate an existing cluster as main.
pub fn use_cluster(
    ws: &mut Workspace,
    backend: &dyn ClusterBackend,
    cluster: &str,
) -> BerthResult<ClusterChange> {
    let mut cloud = existing_registry(ws, backend, cluster)?;
    cloud.set_main(cluster)?;
    commit(ws, cloud, cluster)
}

/// One row of `berth cluster list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterEntry {
    pub provider: String,
    pub name: String,
    pub state: ClusterState,
    pub main: bool,
}

/// Every known cluster, grouped by provider in manifest order.
pub fn list_clusters(ws: &Workspace) -> Vec<ClusterEntry> {
    ws.project()
        .clouds
        .iter()
        .flat_map(|cloud| {
            cloud.clusters.iter().filter_map(move |name| {
                cloud.state(name).map(|state| ClusterEntry {
                    provider: cloud.provider.to_string(),
                    name: name.clone(),
                    state,
                    main: cloud.main == *name,
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{DigitalOceanBackend, GcpBackend};
    use crate::core::cloud::Provider;
    use crate::core::error::ErrorKind;
    use crate::core::manifest::Project;
    use crate::test_support::{scenario_project, write_project, MockExecutor, MockProcessOutput};
    use crate::util::GlobalContext;
    use tempfile::TempDir;

    fn workspace(tmp: &TempDir) -> Workspace {
        let mut project = scenario_project();
        let cloud = project.cloud_mut(Provider::Gcp);
        cloud.project = Some("shop-123".into());
        cloud.region = Some("us-central1".into());
        let manifest = write_project(tmp.path(), &project);
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).with_global_config(None);
        Workspace::new(&manifest, &ctx).unwrap()
    }

    fn reload(ws: &Workspace, provider: Provider) -> CloudConfig {
        Project::load(ws.manifest_path())
            .unwrap()
            .cloud(provider)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_provision_first_cluster_becomes_main() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp);
        let backend = GcpBackend::new("gcloud");
        let mut exec = MockExecutor::new();

        let change = provision(&mut ws, &backend, "dev", &mut exec).unwrap();
        assert_eq!(change.main, "dev");
        assert_eq!(
            exec.calls(),
            ["gcloud container clusters create dev --project shop-123 --region us-central1 --num-nodes 1"]
        );

        let cloud = reload(&ws, Provider::Gcp);
        assert_eq!(cloud.clusters, vec!["dev"]);
        assert_eq!(cloud.main, "dev");
    }

    #[test]
    fn test_provision_duplicate_conflicts_before_running() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp);
        let backend = GcpBackend::new("gcloud");
        let mut exec = MockExecutor::new();
        provision(&mut ws, &backend, "dev", &mut exec).unwrap();

        let mut exec = MockExecutor::new();
        let err = provision(&mut ws, &backend, "dev", &mut exec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn test_failed_provision_persists_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp);
        let backend = GcpBackend::new("gcloud");
        let mut exec = MockExecutor::new();
        exec.expect_prefix(
            "gcloud container clusters create",
            MockProcessOutput::failure(1, "ERROR: quota exceeded"),
        );

        let err = provision(&mut ws, &backend, "dev", &mut exec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalFailure);
        assert!(err.to_string().contains("quota exceeded"));
        assert!(reload(&ws, Provider::Gcp).clusters.is_empty());
    }

    #[test]
    fn test_provision_unknown_gcp_project() {
        let tmp = TempDir::new().unwrap();
        let manifest = write_project(tmp.path(), &scenario_project());
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).with_global_config(None);
        let mut ws = Workspace::new(&manifest, &ctx).unwrap();
        let backend = GcpBackend::new("gcloud");
        let mut exec = MockExecutor::new();
        exec.expect_prefix(
            "gcloud projects describe",
            MockProcessOutput::failure(1, "NOT_FOUND"),
        );

        let err = provision(&mut ws, &backend, "dev", &mut exec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(exec.calls().len(), 1);
        let cloud = reload(&ws, Provider::Gcp);
        assert!(cloud.clusters.is_empty());
        assert!(cloud.project.is_none());
    }

    #[test]
    fn test_delete_main_promotes_next() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp);
        let backend = GcpBackend::new("gcloud");
        let mut exec = MockExecutor::new();
        for name in ["a", "b", "c"] {
            provision(&mut ws, &backend, name, &mut exec).unwrap();
        }

        let change = delete(&mut ws, &backend, "a", &mut exec).unwrap();
        assert_eq!(change.main, "b");
        let cloud = reload(&ws, Provider::Gcp);
        assert_eq!(cloud.clusters, vec!["b", "c"]);
        assert_eq!(cloud.main, "b");

        delete(&mut ws, &backend, "b", &mut exec).unwrap();
        let change = delete(&mut ws, &backend, "c", &mut exec).unwrap();
        assert_eq!(change.main, "");

        let err = delete(&mut ws, &backend, "c", &mut exec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_pause_and_start() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp);
        let backend = GcpBackend::new("gcloud");
        let mut exec = MockExecutor::new();
        provision(&mut ws, &backend, "dev", &mut exec).unwrap();

        pause(&mut ws, &backend, "dev", &mut exec).unwrap();
        assert_eq!(reload(&ws, Provider::Gcp).paused, vec!["dev"]);
        let err = pause(&mut ws, &backend, "dev", &mut exec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        start(&mut ws, &backend, "dev", &mut exec).unwrap();
        assert!(reload(&ws, Provider::Gcp).paused.is_empty());
        assert!(exec
            .calls()
            .iter()
            .any(|c| c.contains("resize dev") && c.contains("--num-nodes 0")));

        let err = pause(&mut ws, &backend, "ghost", &mut exec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_pause_unsupported_on_digitalocean() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp);
        let backend = DigitalOceanBackend::new("doctl");
        let mut exec = MockExecutor::new();
        provision(&mut ws, &backend, "dev", &mut exec).unwrap();
        assert_eq!(
            exec.calls(),
            ["doctl kubernetes cluster create dev --region nyc1 --count 1"]
        );

        let mut exec = MockExecutor::new();
        let err = pause(&mut ws, &backend, "dev", &mut exec).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
        assert!(exec.calls().is_empty());
        assert!(reload(&ws, Provider::Digitalocean).paused.is_empty());
    }

    #[test]
    fn test_use_and_list() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp);
        let backend = GcpBackend::new("gcloud");
        let mut exec = MockExecutor::new();
        provision(&mut ws, &backend, "dev", &mut exec).unwrap();
        provision(&mut ws, &backend, "prod", &mut exec).unwrap();

        use_cluster(&mut ws, &backend, "prod").unwrap();
        let entries = list_clusters(&ws);
        assert_eq!(entries.len(), 2);
        assert!(!entries[0].main);
        assert!(entries[1].main);
        assert_eq!(entries[1].state, ClusterState::Running);

        let err = use_cluster(&mut ws, &backend, "ghost").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
