//! Addons: auxiliary services attached to one or more resources.

use serde::{Deserialize, Serialize};

use crate::core::error::{BerthError, BerthResult};
use crate::core::resource::{is_env_key, validate_name, DatabaseEngine, Hosts};

/// A data store owned by an addon (for example the user table of an auth
/// service). It is deployed as a separate release named `{addon}-db`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonDatabase {
    pub engine: DatabaseEngine,

    pub port: u16,

    /// Persistent volume size, e.g. `1Gi`
    #[serde(default = "default_size")]
    pub size: String,
}

fn default_size() -> String {
    "1Gi".to_string()
}

impl AddonDatabase {
    pub fn new(engine: DatabaseEngine, port: u16) -> Self {
        AddonDatabase {
            engine,
            port,
            size: default_size(),
        }
    }

    /// Name of the service/release holding the store.
    pub fn service_name(addon: &str) -> String {
        format!("{}-db", addon)
    }

    pub fn hosts(&self, addon: &str) -> Hosts {
        let service = Self::service_name(addon);
        Hosts {
            local: format!("127.0.0.1:{}", self.port),
            test: format!("{}:{}", service, self.port),
            cluster: self.engine.cluster_host(&service, self.port),
            cluster_read: None,
        }
    }
}

/// An auxiliary service serving one or more resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addon {
    /// Addon name (the key in `[addons]`)
    #[serde(skip)]
    pub name: String,

    pub port: u16,

    pub image: String,

    /// Resources served by this addon, in attach order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    /// Raw `KEY=VALUE` assignments appended after derived wiring
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,

    pub hosts: Hosts,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<AddonDatabase>,
}

impl Addon {
    pub fn new(
        name: impl Into<String>,
        port: u16,
        image: impl Into<String>,
        project: &str,
    ) -> BerthResult<Self> {
        let name = name.into();
        validate_name(&name)?;
        let hosts = Hosts::for_service(&name, port, project);
        Ok(Addon {
            name,
            port,
            image: image.into(),
            dependencies: Vec::new(),
            env: Vec::new(),
            hosts,
            database: None,
        })
    }

    /// Parse the raw environment assignments into ordered pairs.
    pub fn env_pairs(&self) -> BerthResult<Vec<(String, String)>> {
        self.env
            .iter()
            .map(|raw| {
                raw.split_once('=')
                    .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                    .filter(|(k, _)| is_env_key(k))
                    .ok_or_else(|| {
                        BerthError::Config(format!(
                            "addon `{}` has malformed env entry `{}` (expected KEY=VALUE)",
                            self.name, raw
                        ))
                    })
            })
            .collect()
    }
}
