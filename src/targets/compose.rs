//! Local container target (`berth test`): one docker-compose document for
//! the whole project.

use indexmap::IndexMap;
use serde::Serialize;

use crate::core::addon::{Addon, AddonDatabase};
use crate::core::error::{BerthError, BerthResult};
use crate::core::manifest::Project;
use crate::core::resource::{DatabaseEngine, Resource};
use crate::wiring::{Resolver, Target};

/// A docker-compose document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComposeDocument {
    pub services: IndexMap<String, ComposeService>,

    pub networks: IndexMap<String, ComposeNetwork>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub volumes: IndexMap<String, ComposeVolume>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposeService {
    pub image: String,

    pub ports: Vec<String>,

    pub networks: Vec<String>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposeNetwork {
    pub driver: String,
}

impl Default for ComposeNetwork {
    fn default() -> Self {
        ComposeNetwork {
            driver: "bridge".to_string(),
        }
    }
}

/// A named volume with default driver settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComposeVolume {}

impl ComposeDocument {
    pub fn to_yaml(&self) -> BerthResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Result of composing a project: the document plus the entities that
/// could not be added.
#[derive(Debug)]
pub struct ComposeBuild {
    pub document: ComposeDocument,
    pub added: Vec<String>,
    pub failed: Vec<(String, BerthError)>,
}

/// Builds the compose document entity by entity.
pub struct ComposeBuilder<'a> {
    resolver: Resolver<'a>,
    project: &'a Project,
    network: String,
    document: ComposeDocument,
}

impl<'a> ComposeBuilder<'a> {
    pub fn new(project: &'a Project, resolver: Resolver<'a>, network: impl Into<String>) -> Self {
        let network = network.into();
        let mut document = ComposeDocument::default();
        document
            .networks
            .insert(network.clone(), ComposeNetwork::default());
        ComposeBuilder {
            resolver,
            project,
            network,
            document,
        }
    }

    /// Add every resource then every addon. A failing entity is recorded and
    /// the rest are still added.
    pub fn build(mut self) -> ComposeBuild {
        let mut added = Vec::new();
        let mut failed = Vec::new();

        for resource in self.project.resources.values() {
            match self.add_resource(resource) {
                Ok(()) => added.push(resource.name.clone()),
                Err(e) => {
                    tracing::warn!("skipping `{}` in compose file: {}", resource.name, e);
                    failed.push((resource.name.clone(), e));
                }
            }
        }
        for addon in self.project.addons.values() {
            match self.add_addon(addon) {
                Ok(()) => added.push(addon.name.clone()),
                Err(e) => {
                    tracing::warn!("skipping addon `{}` in compose file: {}", addon.name, e);
                    failed.push((addon.name.clone(), e));
                }
            }
        }

        self.prune_dependencies();

        ComposeBuild {
            document: self.document,
            added,
            failed,
        }
    }

    /// Add one resource's service entry.
    pub fn add_resource(&mut self, resource: &Resource) -> BerthResult<()> {
        let wiring = self.resolver.resolve_resource(resource, Target::Test)?;

        let service = if let Some(engine) = resource.engine() {
            let (user, password, database) = resource.credentials();
            let mut service = self.database_service(
                &resource.name,
                engine,
                resource.port,
                (user, password, database),
            );
            service.image = resource.image.clone();
            service.environment.extend(wiring.to_map());
            service
        } else {
            let mut depends_on: Vec<String> =
                self.project.databases().map(|d| d.name.clone()).collect();
            depends_on.extend(resource.dependents.iter().cloned());
            ComposeService {
                image: resource.image.clone(),
                ports: vec![port_mapping(resource.port)],
                networks: vec![self.network.clone()],
                environment: wiring.to_map(),
                volumes: Vec::new(),
                command: Vec::new(),
                depends_on,
            }
        };

        self.document.services.insert(resource.name.clone(), service);
        Ok(())
    }

    /// Add an addon's service entry, followed by its store if it owns one.
    pub fn add_addon(&mut self, addon: &Addon) -> BerthResult<()> {
        let wiring = self.resolver.resolve_addon(addon, Target::Test)?;

        let mut depends_on: Vec<String> =
            self.project.databases().map(|d| d.name.clone()).collect();
        let store = addon.database.as_ref().map(|db| {
            let name = AddonDatabase::service_name(&addon.name);
            depends_on.push(name.clone());
            let service = self.database_service(
                &name,
                db.engine,
                db.port,
                ("berth", "berth", addon.name.as_str()),
            );
            (name, service)
        });

        self.document.services.insert(
            addon.name.clone(),
            ComposeService {
                image: addon.image.clone(),
                ports: vec![port_mapping(addon.port)],
                networks: vec![self.network.clone()],
                environment: wiring.to_map(),
                volumes: Vec::new(),
                command: Vec::new(),
                depends_on,
            },
        );
        if let Some((name, service)) = store {
            self.document.services.insert(name, service);
        }
        Ok(())
    }

    fn database_service(
        &mut self,
        name: &str,
        engine: DatabaseEngine,
        port: u16,
        (user, password, database): (&str, &str, &str),
    ) -> ComposeService {
        let volume = format!("{}-data", name);
        self.document
            .volumes
            .insert(volume.clone(), ComposeVolume::default());

        let (user_var, password_var, database_var) = engine.credential_env();
        let mut environment = IndexMap::new();
        environment.insert(user_var.to_string(), user.to_string());
        environment.insert(password_var.to_string(), password.to_string());
        environment.insert(database_var.to_string(), database.to_string());

        // The container listens where the wiring says it does.
        let mut command = Vec::new();
        if port != engine.default_port() {
            match engine.port_env() {
                Some(var) => {
                    environment.insert(var.to_string(), port.to_string());
                }
                None => command = vec!["--port".to_string(), port.to_string()],
            }
        }

        ComposeService {
            image: engine.default_image().to_string(),
            ports: vec![port_mapping(port)],
            networks: vec![self.network.clone()],
            environment,
            volumes: vec![format!("{}:{}", volume, engine.data_dir())],
            command,
            depends_on: Vec::new(),
        }
    }

    /// Drop `depends_on` entries naming services that failed to compose.
    fn prune_dependencies(&mut self) {
        let present: Vec<String> = self.document.services.keys().cloned().collect();
        for service in self.document.services.values_mut() {
            service
                .depends_on
                .retain(|name| present.iter().any(|p| p == name));
        }
    }
}

fn port_mapping(port: u16) -> String {
    format!("{}:{}", port, port)
}
