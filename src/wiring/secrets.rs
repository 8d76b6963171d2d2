//! Per-entity secret files (`.berth/secrets/{name}.env`).

use std::path::{Path, PathBuf};

use crate::core::error::{BerthError, BerthResult};
use crate::core::resource::is_env_key;
use crate::util::fs;

/// Parse `KEY=VALUE` lines.
///
/// Blank lines and `#` comments are skipped, a leading `export ` is dropped
/// and a value wrapped in matching quotes is unwrapped.
pub fn parse_secrets(content: &str, path: &Path) -> BerthResult<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let (key, value) = line
            .split_once('=')
            .map(|(k, v)| (k.trim(), v.trim()))
            .filter(|(k, _)| is_env_key(k))
            .ok_or_else(|| BerthError::InvalidManifest {
                path: path.to_path_buf(),
                message: format!("line {}: expected KEY=VALUE", idx + 1),
            })?;
        pairs.push((key.to_string(), unquote(value).to_string()));
    }
    Ok(pairs)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Locates and reads secret files.
#[derive(Debug, Clone, Default)]
pub struct SecretStore {
    dir: Option<PathBuf>,
}

impl SecretStore {
    /// Secrets stored under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SecretStore {
            dir: Some(dir.into()),
        }
    }

    /// A store with no secrets at all.
    pub fn none() -> Self {
        SecretStore { dir: None }
    }

    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(format!("{}.env", name)))
    }

    /// Secrets for `name`; a missing file means no secrets.
    pub fn load(&self, name: &str) -> BerthResult<Vec<(String, String)>> {
        let Some(path) = self.path_for(name) else {
            return Ok(Vec::new());
        };
        match fs::read_optional(&path)? {
            Some(content) => {
                let pairs = parse_secrets(&content, &path)?;
                tracing::debug!("read {} secrets from {}", pairs.len(), path.display());
                Ok(pairs)
            }
            None => Ok(Vec::new()),
        }
    }
}
