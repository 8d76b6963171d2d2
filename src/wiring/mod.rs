//! Environment wiring: connection settings derived from the dependency graph.
//!
//! For a resource or addon the resolver produces an ordered list of
//! `KEY=VALUE` pairs telling it where its peers live in a given target:
//!
//! 1. `{db}HOST` for every database, plus `{db}HOST_READ` on deploy when the
//!    database has a read endpoint
//! 2. `{app}HOST` for every other non-database resource (resources only)
//! 3. `{addon}HOST` for every attached addon (resources only); an addon
//!    instead gets `{resource}HOST` for each resource it serves and
//!    `{addon}DBHOST` for the store it owns
//! 4. the entity's own environment, then its secret file on run and test
//!
//! A key produced twice keeps its first position and takes the later value.

pub mod secrets;

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::core::addon::Addon;
use crate::core::error::{BerthError, BerthResult};
use crate::core::manifest::Project;
use crate::core::resource::{Hosts, Resource};

pub use secrets::{parse_secrets, SecretStore};

/// Execution target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Local processes (`berth run`)
    Run,
    /// Local containers (`berth test`)
    Test,
    /// Kubernetes cluster (`berth deploy`)
    Deploy,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Run => "run",
            Target::Test => "test",
            Target::Deploy => "deploy",
        }
    }

    /// The address of an entity in this target.
    pub fn host<'h>(&self, hosts: &'h Hosts) -> &'h str {
        match self {
            Target::Run => &hosts.local,
            Target::Test => &hosts.test,
            Target::Deploy => &hosts.cluster,
        }
    }

    /// Whether secret files are merged into the wiring.
    ///
    /// Deploy keeps secrets apart so they can be stored as cluster secrets.
    pub fn inlines_secrets(&self) -> bool {
        !matches!(self, Target::Deploy)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "run" | "local" => Ok(Target::Run),
            "test" | "compose" => Ok(Target::Test),
            "deploy" | "cluster" => Ok(Target::Deploy),
            _ => Err(format!(
                "invalid target '{}'; expected 'run', 'test', or 'deploy'",
                s
            )),
        }
    }
}

/// Ordered, duplicate-free connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wiring {
    pairs: Vec<(String, String)>,
}

impl Wiring {
    pub fn new() -> Self {
        Wiring::default()
    }

    /// Append a pair. An existing key keeps its slot and takes the new value.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => {
                tracing::debug!("`{}` overridden", key);
                slot.1 = value;
            }
            None => self.pairs.push((key, value)),
        }
    }

    pub fn extend<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in pairs {
            self.push(k, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Project into a map, preserving order.
    pub fn to_map(&self) -> IndexMap<String, String> {
        self.pairs.iter().cloned().collect()
    }
}

impl IntoIterator for Wiring {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

/// Derives wiring from a project snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    project: &'a Project,
    secrets: &'a SecretStore,
}

impl<'a> Resolver<'a> {
    pub fn new(project: &'a Project, secrets: &'a SecretStore) -> Self {
        Resolver { project, secrets }
    }

    /// Wiring for a resource or an addon, whichever owns `name`.
    pub fn resolve(&self, name: &str, target: Target) -> BerthResult<Wiring> {
        if let Some(resource) = self.project.resources.get(name) {
            self.resolve_resource(resource, target)
        } else if let Some(addon) = self.project.addons.get(name) {
            self.resolve_addon(addon, target)
        } else {
            Err(BerthError::not_found("resource or addon", name))
        }
    }

    /// Wiring for a resource.
    ///
    /// Databases do not connect to anything; they only get their own
    /// environment.
    pub fn resolve_resource(&self, resource: &Resource, target: Target) -> BerthResult<Wiring> {
        let mut wiring = Wiring::new();

        if !resource.is_database() {
            self.push_databases(&mut wiring, target, &resource.name);

            for app in self.project.apps().filter(|r| r.name != resource.name) {
                wiring.push(host_key(&app.name), target.host(&app.hosts));
            }

            for addon_name in &resource.dependents {
                let addon = self.project.addons.get(addon_name).ok_or_else(|| {
                    BerthError::integrity(format!(
                        "resource `{}` references missing addon `{}`",
                        resource.name, addon_name
                    ))
                })?;
                wiring.push(host_key(&addon.name), target.host(&addon.hosts));
            }
        }

        wiring.extend(resource.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        if target.inlines_secrets() {
            wiring.extend(self.secrets.load(&resource.name)?);
        }

        tracing::debug!("{} wiring for `{}`: {:?}", target, resource.name, wiring.pairs);
        Ok(wiring)
    }

    /// Wiring for an addon.
    pub fn resolve_addon(&self, addon: &Addon, target: Target) -> BerthResult<Wiring> {
        let mut wiring = Wiring::new();
        self.push_databases(&mut wiring, target, &addon.name);

        for resource_name in &addon.dependencies {
            let resource = self.project.resources.get(resource_name).ok_or_else(|| {
                BerthError::integrity(format!(
                    "addon `{}` references missing resource `{}`",
                    addon.name, resource_name
                ))
            })?;
            wiring.push(host_key(&resource.name), target.host(&resource.hosts));
        }

        if let Some(db) = &addon.database {
            let hosts = db.hosts(&addon.name);
            wiring.push(format!("{}DBHOST", addon.name), target.host(&hosts));
        }

        wiring.extend(addon.env_pairs()?);
        if target.inlines_secrets() {
            wiring.extend(self.secrets.load(&addon.name)?);
        }

        tracing::debug!("{} wiring for addon `{}`: {:?}", target, addon.name, wiring.pairs);
        Ok(wiring)
    }

    /// Secrets kept out of the deploy wiring, for secret directives.
    pub fn secrets(&self, name: &str) -> BerthResult<Vec<(String, String)>> {
        self.secrets.load(name)
    }

    fn push_databases(&self, wiring: &mut Wiring, target: Target, exclude: &str) {
        for db in self.project.databases().filter(|d| d.name != exclude) {
            wiring.push(host_key(&db.name), target.host(&db.hosts));
            if target == Target::Deploy {
                if let Some(read) = &db.hosts.cluster_read {
                    wiring.push(format!("{}HOST_READ", db.name), read.as_str());
                }
            }
        }
    }
}

fn host_key(name: &str) -> String {
    format!("{}HOST", name)
}
