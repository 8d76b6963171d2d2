//! Workspace - the project root and everything berth keeps under it.

use std::path::{Path, PathBuf};

use crate::core::error::BerthResult;
use crate::core::manifest::Project;
use crate::util::config::{load_config, Config};
use crate::util::GlobalContext;
use crate::wiring::SecretStore;

/// Manifest file name.
pub const MANIFEST_NAME: &str = "Berth.toml";

/// Composed test document written by `berth test`.
pub const COMPOSE_FILE: &str = "docker-compose.yml";

/// A loaded project with its root directory and merged configuration.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    manifest_path: PathBuf,
    project: Project,
    config: Config,
}

impl Workspace {
    /// Load the workspace whose manifest is at `manifest_path`.
    pub fn new(manifest_path: &Path, ctx: &GlobalContext) -> BerthResult<Self> {
        let project = Project::load(manifest_path)?;
        let root = manifest_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();
        let config = load_config(ctx.global_config(), &config_path(&root));

        Ok(Workspace {
            root,
            manifest_path: manifest_path.to_path_buf(),
            project,
            config,
        })
    }

    /// Find and load the workspace enclosing the context's working directory.
    pub fn discover(ctx: &GlobalContext) -> BerthResult<Self> {
        let manifest_path = ctx.find_manifest()?;
        Self::new(&manifest_path, ctx)
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the workspace root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Get the .berth directory.
    pub fn berth_dir(&self) -> PathBuf {
        berth_dir(&self.root)
    }

    pub fn secrets_dir(&self) -> PathBuf {
        secrets_dir(&self.root)
    }

    pub fn secrets(&self) -> SecretStore {
        SecretStore::new(self.secrets_dir())
    }

    pub fn compose_path(&self) -> PathBuf {
        self.root.join(COMPOSE_FILE)
    }

    /// Apply one logical change to the project and write it back.
    ///
    /// `change` works on a copy; the manifest on disk and in memory is only
    /// replaced when it succeeds and the result validates.
    pub fn update<T>(
        &mut self,
        change: impl FnOnce(&mut Project) -> BerthResult<T>,
    ) -> BerthResult<T> {
        let mut project = self.project.clone();
        let out = change(&mut project)?;
        project.save(&self.manifest_path)?;
        self.project = project;
        Ok(out)
    }
}

/// The `.berth` directory under a project root.
pub fn berth_dir(root: &Path) -> PathBuf {
    root.join(".berth")
}

pub fn secrets_dir(root: &Path) -> PathBuf {
    berth_dir(root).join("secrets")
}

/// Project configuration file (.berth/config.toml).
pub fn config_path(root: &Path) -> PathBuf {
    berth_dir(root).join("config.toml")
}
