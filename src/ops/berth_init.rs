//! Implementation of `berth init`.

use std::path::{Path, PathBuf};

use crate::core::cloud::Provider;
use crate::core::error::{BerthError, BerthResult};
use crate::core::manifest::Project;
use crate::core::workspace::{secrets_dir, MANIFEST_NAME};
use crate::util::fs;

const GITIGNORE_ENTRY: &str = ".berth/secrets/";

/// Options for creating a project.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Project name (defaults to the directory name)
    pub name: Option<String>,

    /// Provider of the initial cloud config
    pub provider: Provider,
}

/// Create `Berth.toml`, the secrets directory and a `.gitignore` entry in
/// `root`. Returns the manifest path.
pub fn init_project(root: &Path, opts: &InitOptions) -> BerthResult<PathBuf> {
    let manifest_path = root.join(MANIFEST_NAME);
    if manifest_path.exists() {
        return Err(BerthError::conflict(format!(
            "`{}` already exists in `{}`",
            MANIFEST_NAME,
            root.display()
        )));
    }

    let name = match &opts.name {
        Some(name) => name.clone(),
        None => default_name(root)?,
    };
    let project = Project::new(name, opts.provider)?;

    fs::ensure_dir(root)?;
    project.save(&manifest_path)?;
    fs::ensure_dir(&secrets_dir(root))?;
    ignore_secrets(root)?;

    tracing::info!("created project `{}`", project.name());
    Ok(manifest_path)
}

/// The directory name, lowercased with `_` and spaces turned into `-`.
fn default_name(root: &Path) -> BerthResult<String> {
    let dir = root
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            BerthError::Config(format!(
                "cannot derive a project name from `{}`; pass --name",
                root.display()
            ))
        })?;
    Ok(dir.to_lowercase().replace(['_', ' '], "-"))
}

fn ignore_secrets(root: &Path) -> BerthResult<()> {
    let path = root.join(".gitignore");
    let mut content = fs::read_optional(&path)?.unwrap_or_default();
    if content.lines().any(|l| l.trim() == GITIGNORE_ENTRY) {
        return Ok(());
    }
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(GITIGNORE_ENTRY);
    content.push('\n');
    fs::write_string(&path, &content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use tempfile::TempDir;

    fn opts(name: &str) -> InitOptions {
        InitOptions {
            name: Some(name.into()),
            provider: Provider::Gcp,
        }
    }

    #[test]
    fn test_init_project() {
        let tmp = TempDir::new().unwrap();
        let manifest = init_project(tmp.path(), &opts("shop")).unwrap();

        let project = Project::load(&manifest).unwrap();
        assert_eq!(project.name(), "shop");
        assert_eq!(project.clouds.len(), 1);
        assert_eq!(project.clouds[0].provider, Provider::Gcp);
        assert!(tmp.path().join(".berth/secrets").is_dir());
        assert_eq!(
            std::fs::read_to_string(tmp.path().join(".gitignore")).unwrap(),
            ".berth/secrets/\n"
        );
    }

    #[test]
    fn test_init_existing_manifest_conflicts() {
        let tmp = TempDir::new().unwrap();
        init_project(tmp.path(), &opts("shop")).unwrap();
        let err = init_project(tmp.path(), &opts("shop")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_init_keeps_gitignore() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(".gitignore"), "node_modules").unwrap();
        init_project(tmp.path(), &opts("shop")).unwrap();
        assert_eq!(
            std::fs::read_to_string(tmp.path().join(".gitignore")).unwrap(),
            "node_modules\n.berth/secrets/\n"
        );
    }

    #[test]
    fn test_default_name_from_directory() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("My_Shop");
        let manifest = init_project(
            &root,
            &InitOptions {
                name: None,
                provider: Provider::Digitalocean,
            },
        )
        .unwrap();
        let project = Project::load(&manifest).unwrap();
        assert_eq!(project.name(), "my-shop");
        assert_eq!(project.clouds[0].provider, Provider::Digitalocean);
    }

    #[test]
    fn test_invalid_name() {
        let tmp = TempDir::new().unwrap();
        let err = init_project(tmp.path(), &opts("Shop!")).unwrap_err();
        assert!(matches!(err, BerthError::InvalidName { .. }));
        assert!(!tmp.path().join("Berth.toml").exists());
    }
}
