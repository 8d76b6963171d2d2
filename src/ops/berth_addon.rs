//! Implementation of `berth addon` subcommands.

use crate::core::addon::{Addon, AddonDatabase};
use crate::core::error::BerthResult;
use crate::core::resource::DatabaseEngine;
use crate::core::workspace::Workspace;

/// Options for enabling an addon.
#[derive(Debug, Clone)]
pub struct EnableAddonOptions {
    pub name: String,

    pub port: u16,

    /// Container image (defaults to `{project}-{name}:latest`)
    pub image: Option<String>,

    /// Resources the addon serves
    pub serves: Vec<String>,

    /// Raw `KEY=VALUE` assignments
    pub env: Vec<String>,

    /// Engine of the addon's own data store
    pub database: Option<DatabaseEngine>,

    /// Port of the data store (defaults to the engine port)
    pub database_port: Option<u16>,
}

impl EnableAddonOptions {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        EnableAddonOptions {
            name: name.into(),
            port,
            image: None,
            serves: Vec::new(),
            env: Vec::new(),
            database: None,
            database_port: None,
        }
    }
}

/// Enable an addon and attach it to the resources it serves.
pub fn enable_addon(ws: &mut Workspace, opts: &EnableAddonOptions) -> BerthResult<Addon> {
    let project_name = ws.project().name().to_string();
    let image = opts
        .image
        .clone()
        .unwrap_or_else(|| format!("{}-{}:latest", project_name, opts.name));

    let mut addon = Addon::new(opts.name.clone(), opts.port, image, &project_name)?;
    addon.env = opts.env.clone();
    addon.database = opts.database.map(|engine| {
        AddonDatabase::new(engine, opts.database_port.unwrap_or(engine.default_port()))
    });
    // Validate the entries now rather than at the first deploy.
    addon.env_pairs()?;

    ws.update(|project| {
        project.enable_addon(addon, &opts.serves)?;
        project.addon(&opts.name).cloned()
    })
}

/// Disable an addon, detaching it everywhere.
pub fn disable_addon(ws: &mut Workspace, name: &str) -> BerthResult<Addon> {
    ws.update(|project| project.disable_addon(name))
}

/// Attach an addon to each of `resources`. Returns the number of new edges.
///
/// Either every edge is recorded or none is.
pub fn attach(ws: &mut Workspace, addon: &str, resources: &[String]) -> BerthResult<usize> {
    ws.update(|project| {
        let mut added = 0;
        for resource in resources {
            if project.attach(addon, resource)? {
                added += 1;
            }
        }
        Ok(added)
    })
}

/// Detach an addon from each of `resources`. Returns the number of removed
/// edges.
pub fn detach(ws: &mut Workspace, addon: &str, resources: &[String]) -> BerthResult<usize> {
    ws.update(|project| {
        let mut removed = 0;
        for resource in resources {
            if project.detach(addon, resource)? {
                removed += 1;
            }
        }
        Ok(removed)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{BerthError, ErrorKind};
    use crate::core::manifest::Project;
    use crate::core::resource::{Resource, ResourceKind};
    use crate::test_support::{scenario_project, write_project};
    use crate::util::GlobalContext;
    use tempfile::TempDir;

    fn workspace(tmp: &TempDir, project: &Project) -> Workspace {
        let manifest = write_project(tmp.path(), project);
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).with_global_config(None);
        Workspace::new(&manifest, &ctx).unwrap()
    }

    #[test]
    fn test_enable_with_store() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp, &scenario_project());

        let mut opts = EnableAddonOptions::new("mail", 9100);
        opts.serves = vec!["svc".into()];
        opts.database = Some(DatabaseEngine::Postgres);
        opts.database_port = Some(5433);
        opts.env = vec!["FROM=noreply@shop.test".into()];
        let addon = enable_addon(&mut ws, &opts).unwrap();
        assert_eq!(addon.image, "shop-mail:latest");

        let reloaded = Project::load(ws.manifest_path()).unwrap();
        assert_eq!(reloaded.resources["svc"].dependents, vec!["auth", "mail"]);
        assert_eq!(reloaded.addons["mail"].database.as_ref().unwrap().port, 5433);
    }

    #[test]
    fn test_enable_store_port_collision() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp, &scenario_project());

        let mut opts = EnableAddonOptions::new("mail", 9100);
        opts.database = Some(DatabaseEngine::Postgres);
        let err = enable_addon(&mut ws, &opts).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(!ws.project().addons.contains_key("mail"));
    }

    #[test]
    fn test_enable_rejects_malformed_env() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp, &scenario_project());

        let mut opts = EnableAddonOptions::new("mail", 9100);
        opts.env = vec!["NOPE".into()];
        assert!(matches!(
            enable_addon(&mut ws, &opts),
            Err(BerthError::Config(_))
        ));
    }

    #[test]
    fn test_attach_unknown_resource_leaves_manifest() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp, &scenario_project());
        let before = std::fs::read_to_string(ws.manifest_path()).unwrap();

        let err = attach(&mut ws, "auth", &["ghost".to_string()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(std::fs::read_to_string(ws.manifest_path()).unwrap(), before);
    }

    #[test]
    fn test_attach_detach_roundtrip() {
        let mut project = scenario_project();
        project
            .add_resource(
                Resource::new("admin", ResourceKind::Api, 8081, "express", "shop").unwrap(),
            )
            .unwrap();
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp, &project);

        let resources = vec!["svc".to_string(), "admin".to_string()];
        assert_eq!(attach(&mut ws, "auth", &resources).unwrap(), 1);
        assert_eq!(attach(&mut ws, "auth", &resources).unwrap(), 0);

        let reloaded = Project::load(ws.manifest_path()).unwrap();
        assert_eq!(reloaded.addons["auth"].dependencies, vec!["svc", "admin"]);
        assert_eq!(reloaded.resources["admin"].dependents, vec!["auth"]);

        assert_eq!(detach(&mut ws, "auth", &resources).unwrap(), 2);
        let reloaded = Project::load(ws.manifest_path()).unwrap();
        assert!(reloaded.addons["auth"].dependencies.is_empty());
        assert!(reloaded.resources["svc"].dependents.is_empty());
    }

    #[test]
    fn test_disable_cascades() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp, &scenario_project());
        disable_addon(&mut ws, "auth").unwrap();

        let reloaded = Project::load(ws.manifest_path()).unwrap();
        assert!(reloaded.addons.is_empty());
        assert!(reloaded.resources["svc"].dependents.is_empty());
    }
}
