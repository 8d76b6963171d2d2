//! Global context for berth operations.
//!
//! Provides centralized access to the working directory and the global
//! configuration location.

use std::path::{Path, PathBuf};

use crate::core::error::{BerthError, BerthResult};
use crate::core::workspace::MANIFEST_NAME;
use crate::util::config::global_config_path;

/// Global context: where berth was invoked and where its global config lives.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Global configuration file (~/.berth/config.toml)
    global_config: Option<PathBuf>,
}

impl GlobalContext {
    /// Create a new GlobalContext for the process working directory.
    pub fn new() -> BerthResult<Self> {
        let cwd = std::env::current_dir().map_err(|e| BerthError::io(".", e))?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        GlobalContext {
            cwd,
            global_config: global_config_path(),
        }
    }

    /// Override the global configuration file (`None` disables it).
    pub fn with_global_config(mut self, path: Option<PathBuf>) -> Self {
        self.global_config = path;
        self
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the global configuration file path.
    pub fn global_config(&self) -> Option<&Path> {
        self.global_config.as_deref()
    }

    /// Find `Berth.toml` starting from cwd and searching upward.
    pub fn find_manifest(&self) -> BerthResult<PathBuf> {
        let mut current = self.cwd.clone();
        loop {
            let candidate = current.join(MANIFEST_NAME);
            if candidate.is_file() {
                return Ok(candidate);
            }
            if !current.pop() {
                return Err(BerthError::ManifestNotFound(self.cwd.clone()));
            }
        }
    }
}
