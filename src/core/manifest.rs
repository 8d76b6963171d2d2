//! Berth.toml manifest parsing, validation and persistence.
//!
//! The manifest is the single document describing a project: its resources,
//! addons and cluster registrations. Every mutating command loads it, changes
//! it in memory and writes it back once with [`Project::save`].

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::core::addon::{Addon, AddonDatabase};
use crate::core::cloud::{CloudConfig, Provider};
use crate::core::error::{BerthError, BerthResult};
use crate::core::resource::{is_env_key, validate_name, Resource};
use crate::util::fs;

/// Project metadata from the `[project]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Project name, also the cluster namespace for apps and addons
    pub name: String,

    /// Project version (semver)
    pub version: String,

    #[serde(default)]
    pub description: String,
}

impl ProjectMetadata {
    /// Parse the version string as semver.
    pub fn version(&self) -> Result<Version, semver::Error> {
        self.version.parse()
    }
}

/// The parsed Berth.toml manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub metadata: ProjectMetadata,

    /// Resources in insertion order
    pub resources: IndexMap<String, Resource>,

    /// Addons in insertion order
    pub addons: IndexMap<String, Addon>,

    /// At most one cluster registry per provider
    pub clouds: Vec<CloudConfig>,
}

/// Manifest as laid out in TOML.
#[derive(Debug, Serialize, Deserialize)]
struct RawProject {
    project: ProjectMetadata,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    resources: IndexMap<String, Resource>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    addons: IndexMap<String, Addon>,

    #[serde(default, rename = "cloud", skip_serializing_if = "Vec::is_empty")]
    clouds: Vec<CloudConfig>,
}

impl Project {
    /// A fresh project with an empty cluster registry for `provider`.
    pub fn new(name: impl Into<String>, provider: Provider) -> BerthResult<Self> {
        let name = name.into();
        validate_project_name(&name)?;
        Ok(Project {
            metadata: ProjectMetadata {
                name,
                version: "0.1.0".to_string(),
                description: String::new(),
            },
            resources: IndexMap::new(),
            addons: IndexMap::new(),
            clouds: vec![CloudConfig::new(provider)],
        })
    }

    /// Load a manifest from a file path.
    pub fn load(path: &Path) -> BerthResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    /// Parse and validate manifest content.
    pub fn parse(content: &str, path: &Path) -> BerthResult<Self> {
        let raw: RawProject = toml::from_str(content).map_err(|e| BerthError::InvalidManifest {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;

        if let Err(e) = raw.project.version() {
            return Err(BerthError::InvalidManifest {
                path: path.to_path_buf(),
                message: format!("invalid version `{}`: {}", raw.project.version, e),
            });
        }

        let mut resources = raw.resources;
        for (name, resource) in resources.iter_mut() {
            resource.name = name.clone();
        }
        let mut addons = raw.addons;
        for (name, addon) in addons.iter_mut() {
            addon.name = name.clone();
        }

        let project = Project {
            metadata: raw.project,
            resources,
            addons,
            clouds: raw.clouds,
        };
        project.validate()?;

        tracing::debug!(
            "loaded {} with {} resources, {} addons",
            path.display(),
            project.resources.len(),
            project.addons.len()
        );
        Ok(project)
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> BerthResult<String> {
        let raw = RawProject {
            project: self.metadata.clone(),
            resources: self.resources.clone(),
            addons: self.addons.clone(),
            clouds: self.clouds.clone(),
        };
        Ok(toml::to_string(&raw)?)
    }

    /// Validate and atomically write the whole document.
    ///
    /// A manifest that fails validation is never written.
    pub fn save(&self, path: &Path) -> BerthResult<()> {
        self.validate()?;
        let content = self.to_toml()?;
        fs::write_atomic(path, &content)?;
        tracing::debug!("wrote {}", path.display());
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Look up a resource by name.
    pub fn resource(&self, name: &str) -> BerthResult<&Resource> {
        self.resources
            .get(name)
            .ok_or_else(|| BerthError::not_found("resource", name))
    }

    /// Look up an addon by name.
    pub fn addon(&self, name: &str) -> BerthResult<&Addon> {
        self.addons
            .get(name)
            .ok_or_else(|| BerthError::not_found("addon", name))
    }

    /// Database-type resources in insertion order.
    pub fn databases(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values().filter(|r| r.is_database())
    }

    /// Non-database resources in insertion order.
    pub fn apps(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values().filter(|r| !r.is_database())
    }

    /// Whether a resource or addon already uses `name`.
    pub fn name_taken(&self, name: &str) -> bool {
        self.resources.contains_key(name) || self.addons.contains_key(name)
    }

    /// The entity currently listening on `port`, if any.
    pub fn port_owner(&self, port: u16) -> Option<String> {
        self.ports().into_iter().find(|(p, _)| *p == port).map(|(_, owner)| owner)
    }

    /// Every host port claimed by the project, with its owner.
    fn ports(&self) -> Vec<(u16, String)> {
        let mut ports: Vec<(u16, String)> = self
            .resources
            .values()
            .map(|r| (r.port, r.name.clone()))
            .collect();
        for addon in self.addons.values() {
            ports.push((addon.port, addon.name.clone()));
            if let Some(db) = &addon.database {
                ports.push((db.port, AddonDatabase::service_name(&addon.name)));
            }
        }
        ports
    }

    pub fn cloud(&self, provider: Provider) -> Option<&CloudConfig> {
        self.clouds.iter().find(|c| c.provider == provider)
    }

    /// The registry for `provider`, created empty when missing.
    pub fn cloud_mut(&mut self, provider: Provider) -> &mut CloudConfig {
        match self.clouds.iter().position(|c| c.provider == provider) {
            Some(idx) => &mut self.clouds[idx],
            None => {
                self.clouds.push(CloudConfig::new(provider));
                let last = self.clouds.len() - 1;
                &mut self.clouds[last]
            }
        }
    }

    /// Check every integrity rule of the document.
    pub fn validate(&self) -> BerthResult<()> {
        let mut seen_names = HashSet::new();
        for name in self.resources.keys().chain(self.addons.keys()) {
            if let Err(e) = validate_name(name) {
                return Err(BerthError::integrity(e.to_string()));
            }
            if !seen_names.insert(name.as_str()) {
                return Err(BerthError::integrity(format!(
                    "`{}` is used by both a resource and an addon",
                    name
                )));
            }
        }

        let mut seen_ports = IndexMap::new();
        for (port, owner) in self.ports() {
            if let Some(first) = seen_ports.insert(port, owner.clone()) {
                return Err(BerthError::integrity(format!(
                    "port {} is used by both `{}` and `{}`",
                    port, first, owner
                )));
            }
        }

        for resource in self.resources.values() {
            self.validate_resource(resource)?;
        }
        for addon in self.addons.values() {
            self.validate_addon(addon)?;
        }

        let mut providers = HashSet::new();
        for cloud in &self.clouds {
            if !providers.insert(cloud.provider) {
                return Err(BerthError::integrity(format!(
                    "provider `{}` is configured more than once",
                    cloud.provider
                )));
            }
            cloud.validate()?;
        }
        Ok(())
    }

    fn validate_resource(&self, resource: &Resource) -> BerthResult<()> {
        if resource.is_database() {
            if resource.engine().is_none() {
                return Err(BerthError::integrity(format!(
                    "database `{}` uses unknown engine `{}`",
                    resource.name, resource.framework
                )));
            }
            if resource.command.is_some() {
                return Err(BerthError::integrity(format!(
                    "database `{}` cannot have a bring-up command",
                    resource.name
                )));
            }
            if !resource.dependents.is_empty() {
                return Err(BerthError::integrity(format!(
                    "database `{}` cannot have addons attached",
                    resource.name
                )));
            }
        }

        if let Some(key) = resource.env.keys().find(|k| !is_env_key(k)) {
            return Err(BerthError::integrity(format!(
                "resource `{}` has invalid environment key `{}`",
                resource.name, key
            )));
        }

        check_unique(&resource.dependents, "dependents", &resource.name)?;
        for addon_name in &resource.dependents {
            let addon = self.addons.get(addon_name).ok_or_else(|| {
                BerthError::integrity(format!(
                    "resource `{}` references missing addon `{}`",
                    resource.name, addon_name
                ))
            })?;
            if !addon.dependencies.contains(&resource.name) {
                return Err(BerthError::integrity(format!(
                    "resource `{}` lists addon `{}` but the addon does not serve it",
                    resource.name, addon_name
                )));
            }
        }
        Ok(())
    }

    fn validate_addon(&self, addon: &Addon) -> BerthResult<()> {
        check_unique(&addon.dependencies, "dependencies", &addon.name)?;
        for resource_name in &addon.dependencies {
            let resource = self.resources.get(resource_name).ok_or_else(|| {
                BerthError::integrity(format!(
                    "addon `{}` references missing resource `{}`",
                    addon.name, resource_name
                ))
            })?;
            if resource.is_database() {
                return Err(BerthError::integrity(format!(
                    "addon `{}` cannot serve database `{}`",
                    addon.name, resource_name
                )));
            }
            if !resource.dependents.contains(&addon.name) {
                return Err(BerthError::integrity(format!(
                    "addon `{}` serves `{}` but the resource does not list it",
                    addon.name, resource_name
                )));
            }
        }
        Ok(())
    }
}

fn check_unique(names: &[String], field: &str, owner: &str) -> BerthResult<()> {
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(BerthError::integrity(format!(
                "`{}` appears twice in {} of `{}`",
                name, field, owner
            )));
        }
    }
    Ok(())
}

/// Project names become cluster namespaces, so they follow DNS label rules.
pub fn validate_project_name(name: &str) -> BerthResult<()> {
    let valid = !name.is_empty()
        && name.len() <= 63
        && name.starts_with(|c: char| c.is_ascii_lowercase())
        && !name.ends_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(BerthError::InvalidName {
            name: name.to_string(),
            reason: "project names must be lowercase DNS labels",
        })
    }
}
