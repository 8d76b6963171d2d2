//! Cluster target (`berth deploy` / `berth undeploy`): helm releases.
//!
//! Directives are kept as ordered key/value lists; `env[i]` and
//! `secrets[i]` indices are only assigned when the `--set` arguments are
//! rendered.

use std::path::Path;

use crate::cloud::ClusterContext;
use crate::core::addon::{Addon, AddonDatabase};
use crate::core::error::{BerthError, BerthResult};
use crate::core::manifest::Project;
use crate::core::resource::{options, DatabaseEngine, Resource, ResourceKind};
use crate::util::process::ProcessBuilder;
use crate::wiring::{Resolver, Target};

const DEFAULT_SIZE: &str = "1Gi";
const DEFAULT_REPLICAS: &str = "1";

/// Where a release lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRef {
    pub release: String,
    pub namespace: String,

    /// The namespace belongs to this release alone and goes away with it
    pub dedicated_namespace: bool,
}

impl ReleaseRef {
    fn shared(release: &str, namespace: &str) -> Self {
        ReleaseRef {
            release: release.to_string(),
            namespace: namespace.to_string(),
            dedicated_namespace: false,
        }
    }

    fn dedicated(release: &str) -> Self {
        ReleaseRef {
            release: release.to_string(),
            namespace: release.to_string(),
            dedicated_namespace: true,
        }
    }

    /// Commands removing the release, and its namespace when dedicated.
    pub fn uninstall(&self, helm: &Path, kubectl: &Path, ctx: &ClusterContext) -> Vec<ProcessBuilder> {
        let mut commands = vec![ProcessBuilder::new(helm)
            .args(["uninstall", self.release.as_str()])
            .args(["--namespace", self.namespace.as_str()])
            .args(["--kube-context", ctx.name.as_str()])];
        if self.dedicated_namespace {
            commands.push(
                ProcessBuilder::new(kubectl)
                    .args(["delete", "namespace", self.namespace.as_str()])
                    .args(["--context", ctx.name.as_str()]),
            );
        }
        commands
    }
}

/// One `helm upgrade --install` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRelease {
    pub target: ReleaseRef,
    pub chart: String,

    /// Plain `--set` values in order
    pub values: Vec<(String, String)>,

    /// Connectivity pairs, rendered as `env[i].name/value`
    pub env: Vec<(String, String)>,

    /// Secret pairs, rendered as `secrets[i].name/value/secretRef`
    pub secrets: Vec<(String, String)>,

    /// Secret object the secret directives are bound to
    pub secret_ref: String,
}

impl ChartRelease {
    fn new(target: ReleaseRef, chart: &str) -> Self {
        let secret_ref = format!("{}-secrets", target.release);
        ChartRelease {
            target,
            chart: chart.to_string(),
            values: Vec::new(),
            env: Vec::new(),
            secrets: Vec::new(),
            secret_ref,
        }
    }

    fn set(&mut self, key: &str, value: impl ToString) {
        self.values.push((key.to_string(), value.to_string()));
    }

    /// Every directive as `key=value`, indices assigned densely from 0.
    pub fn set_directives(&self) -> Vec<String> {
        let mut directives: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| directive(k, v))
            .collect();

        for (i, (name, value)) in self.env.iter().enumerate() {
            directives.push(directive(&format!("env[{}].name", i), name));
            directives.push(directive(&format!("env[{}].value", i), value));
        }
        for (i, (name, value)) in self.secrets.iter().enumerate() {
            directives.push(directive(&format!("secrets[{}].name", i), name));
            directives.push(directive(&format!("secrets[{}].value", i), value));
            directives.push(directive(
                &format!("secrets[{}].secretRef", i),
                &self.secret_ref,
            ));
        }
        directives
    }

    /// The `helm upgrade --install` command for this release.
    pub fn install(&self, helm: &Path, ctx: &ClusterContext) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(helm)
            .args(["upgrade", "--install", self.target.release.as_str(), self.chart.as_str()])
            .args(["--namespace", self.target.namespace.as_str()])
            .arg("--create-namespace")
            .args(["--kube-context", ctx.name.as_str()]);
        for set in self.set_directives() {
            cmd = cmd.arg("--set").arg(set);
        }
        cmd
    }
}

/// Escape a value for helm's `--set` parser.
fn directive(key: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace(',', "\\,");
    format!("{}={}", key, escaped)
}

/// The releases for one resource or addon, in install order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub entity: String,
    pub releases: Vec<ChartRelease>,
}

impl Deployment {
    pub fn install_commands(&self, helm: &Path, ctx: &ClusterContext) -> Vec<ProcessBuilder> {
        self.releases.iter().map(|r| r.install(helm, ctx)).collect()
    }
}

/// Compiles resources and addons into helm releases.
pub struct ChartCompiler<'a> {
    project: &'a Project,
    resolver: Resolver<'a>,
    chart: &'a str,
}

impl<'a> ChartCompiler<'a> {
    /// `chart` is used for apps and addons; databases use their engine chart.
    pub fn new(project: &'a Project, resolver: Resolver<'a>, chart: &'a str) -> Self {
        ChartCompiler {
            project,
            resolver,
            chart,
        }
    }

    /// Releases to install for the resource or addon `name`.
    pub fn deployment(&self, name: &str) -> BerthResult<Deployment> {
        let releases = if let Some(resource) = self.project.resources.get(name) {
            vec![self.resource_release(resource)?]
        } else if let Some(addon) = self.project.addons.get(name) {
            self.addon_releases(addon)?
        } else {
            return Err(BerthError::not_found("resource or addon", name));
        };

        for release in &releases {
            tracing::debug!(
                "release `{}` ({}): {:?}",
                release.target.release,
                release.chart,
                release.set_directives()
            );
        }
        Ok(Deployment {
            entity: name.to_string(),
            releases,
        })
    }

    /// Releases to remove for `name`, in uninstall order.
    pub fn removal(&self, name: &str) -> BerthResult<Vec<ReleaseRef>> {
        if let Some(resource) = self.project.resources.get(name) {
            Ok(vec![self.resource_ref(resource)])
        } else if let Some(addon) = self.project.addons.get(name) {
            let mut refs = vec![ReleaseRef::shared(&addon.name, self.project.name())];
            if addon.database.is_some() {
                refs.push(ReleaseRef::dedicated(&AddonDatabase::service_name(&addon.name)));
            }
            Ok(refs)
        } else {
            Err(BerthError::not_found("resource or addon", name))
        }
    }

    fn resource_ref(&self, resource: &Resource) -> ReleaseRef {
        if resource.is_database() {
            ReleaseRef::dedicated(&resource.name)
        } else {
            ReleaseRef::shared(&resource.name, self.project.name())
        }
    }

    fn resource_release(&self, resource: &Resource) -> BerthResult<ChartRelease> {
        if let Some(engine) = resource.engine() {
            let mut release = ChartRelease::new(self.resource_ref(resource), engine.chart());
            let (user, password, database) = resource.credentials();
            database_values(
                &mut release,
                engine,
                resource.port,
                (user, password, database),
                resource.option_or(options::SIZE, DEFAULT_SIZE),
                resource.option_or(options::REPLICAS, DEFAULT_REPLICAS),
            );
            return Ok(release);
        }

        let mut release = ChartRelease::new(self.resource_ref(resource), self.chart);
        service_values(&mut release, &resource.image, resource.port);
        match resource.kind {
            ResourceKind::Frontend => {
                let host = resource
                    .option(options::HOST)
                    .ok_or_else(|| BerthError::MissingOption {
                        entity: "frontend",
                        name: resource.name.clone(),
                        option: options::HOST,
                    })?;
                probe_values(&mut release, "/");
                release.set("service.type", "LoadBalancer");
                release.set("ingress.enabled", true);
                release.set("ingress.host", host);
            }
            _ => {
                probe_values(&mut release, "/health");
                release.set("service.type", "ClusterIP");
            }
        }

        release.env = self
            .resolver
            .resolve_resource(resource, Target::Deploy)?
            .into_iter()
            .collect();
        release.secrets = self.resolver.secrets(&resource.name)?;
        Ok(release)
    }

    fn addon_releases(&self, addon: &Addon) -> BerthResult<Vec<ChartRelease>> {
        let mut releases = Vec::new();

        if let Some(db) = &addon.database {
            let store = AddonDatabase::service_name(&addon.name);
            let mut release = ChartRelease::new(ReleaseRef::dedicated(&store), db.engine.chart());
            database_values(
                &mut release,
                db.engine,
                db.port,
                ("berth", "berth", addon.name.as_str()),
                &db.size,
                DEFAULT_REPLICAS,
            );
            releases.push(release);
        }

        let mut release = ChartRelease::new(
            ReleaseRef::shared(&addon.name, self.project.name()),
            self.chart,
        );
        service_values(&mut release, &addon.image, addon.port);
        probe_values(&mut release, "/health");
        release.set("service.type", "ClusterIP");
        release.env = self
            .resolver
            .resolve_addon(addon, Target::Deploy)?
            .into_iter()
            .collect();
        release.secrets = self.resolver.secrets(&addon.name)?;
        releases.push(release);

        Ok(releases)
    }
}

fn service_values(release: &mut ChartRelease, image: &str, port: u16) {
    let namespace = release.target.namespace.clone();
    release.set("image", image);
    release.set("service.port", port);
    release.set("namespace", namespace);
}

fn probe_values(release: &mut ChartRelease, path: &str) {
    release.set("probes.readiness.path", path);
    release.set("probes.liveness.path", path);
}

fn database_values(
    release: &mut ChartRelease,
    engine: DatabaseEngine,
    port: u16,
    (user, password, database): (&str, &str, &str),
    size: &str,
    replicas: &str,
) {
    match engine {
        DatabaseEngine::Postgres => {
            release.set("architecture", "replication");
            release.set("auth.username", user);
            release.set("auth.password", password);
            release.set("auth.database", database);
            release.set("primary.persistence.size", size);
            release.set("readReplicas.replicaCount", replicas);
            release.set("primary.service.ports.postgresql", port);
        }
        DatabaseEngine::Mysql => {
            release.set("architecture", "replication");
            release.set("auth.username", user);
            release.set("auth.password", password);
            release.set("auth.database", database);
            release.set("primary.persistence.size", size);
            release.set("secondary.replicaCount", replicas);
            release.set("primary.service.ports.mysql", port);
        }
        DatabaseEngine::Mongodb => {
            release.set("auth.usernames[0]", user);
            release.set("auth.passwords[0]", password);
            release.set("auth.databases[0]", database);
            release.set("persistence.size", size);
            release.set("replicaCount", replicas);
            release.set("service.ports.mongodb", port);
        }
    }
}
