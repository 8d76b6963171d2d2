//! Configuration file support for berth.
//!
//! berth reads two configuration files:
//! - Global: `~/.berth/config.toml` - User-wide defaults
//! - Project: `.berth/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. Unlike `Berth.toml`,
//! neither file is ever written by berth.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::cloud::Provider;
use crate::core::error::{BerthError, BerthResult};

/// Default helm chart for apps and addons.
pub const DEFAULT_CHART: &str = "berth/service";

/// Default compose network name.
pub const DEFAULT_NETWORK: &str = "berth";

/// berth configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External program overrides
    pub tools: ToolsConfig,

    /// Cluster deployment settings
    pub deploy: DeployConfig,

    /// Local container settings
    pub test: TestConfig,
}

/// Program names or paths for the external tools berth drives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub docker: Option<PathBuf>,
    pub helm: Option<PathBuf>,
    pub kubectl: Option<PathBuf>,
    pub gcloud: Option<PathBuf>,
    pub doctl: Option<PathBuf>,
}

/// Deployment settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Helm chart for apps and addons
    pub chart: Option<String>,

    /// Provider used when a command does not name one
    pub provider: Option<Provider>,

    /// Nodes per cluster on provision and start
    pub node_count: Option<u32>,

    /// Region used when the cloud config has none
    pub region: Option<String>,
}

/// Local container settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    /// Shared compose network
    pub network: Option<String>,
}

/// Resolved program paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    pub docker: PathBuf,
    pub helm: PathBuf,
    pub kubectl: PathBuf,
    pub gcloud: PathBuf,
    pub doctl: PathBuf,
}

impl Default for Tools {
    fn default() -> Self {
        Tools {
            docker: PathBuf::from("docker"),
            helm: PathBuf::from("helm"),
            kubectl: PathBuf::from("kubectl"),
            gcloud: PathBuf::from("gcloud"),
            doctl: PathBuf::from("doctl"),
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> BerthResult<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| BerthError::io(path, e))?;

        toml::from_str(&contents).map_err(|e| {
            BerthError::Config(format!("{}: {}", path.display(), e.message()))
        })
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        let tools = other.tools;
        merge_opt(&mut self.tools.docker, tools.docker);
        merge_opt(&mut self.tools.helm, tools.helm);
        merge_opt(&mut self.tools.kubectl, tools.kubectl);
        merge_opt(&mut self.tools.gcloud, tools.gcloud);
        merge_opt(&mut self.tools.doctl, tools.doctl);

        merge_opt(&mut self.deploy.chart, other.deploy.chart);
        merge_opt(&mut self.deploy.provider, other.deploy.provider);
        merge_opt(&mut self.deploy.node_count, other.deploy.node_count);
        merge_opt(&mut self.deploy.region, other.deploy.region);

        merge_opt(&mut self.test.network, other.test.network);
    }

    /// Program paths with defaults filled in.
    pub fn tools(&self) -> Tools {
        let defaults = Tools::default();
        let pick = |configured: &Option<PathBuf>, default: PathBuf| {
            configured.clone().unwrap_or(default)
        };
        Tools {
            docker: pick(&self.tools.docker, defaults.docker),
            helm: pick(&self.tools.helm, defaults.helm),
            kubectl: pick(&self.tools.kubectl, defaults.kubectl),
            gcloud: pick(&self.tools.gcloud, defaults.gcloud),
            doctl: pick(&self.tools.doctl, defaults.doctl),
        }
    }

    pub fn chart(&self) -> &str {
        self.deploy.chart.as_deref().unwrap_or(DEFAULT_CHART)
    }

    pub fn provider(&self) -> Provider {
        self.deploy.provider.unwrap_or_default()
    }

    pub fn node_count(&self) -> u32 {
        self.deploy.node_count.unwrap_or(1)
    }

    pub fn network(&self) -> &str {
        self.test.network.as_deref().unwrap_or(DEFAULT_NETWORK)
    }
}

fn merge_opt<T>(base: &mut Option<T>, other: Option<T>) {
    if other.is_some() {
        *base = other;
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.berth/config.toml)
/// 2. Global config (~/.berth/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }
    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global berth config directory (~/.berth).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".berth"))
}

/// Get the global config path (~/.berth/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}
