//! Implementation of `berth resource add` and `berth resource remove`.

use crate::core::error::{BerthError, BerthResult};
use crate::core::resource::{DatabaseEngine, Resource, ResourceKind};
use crate::core::workspace::Workspace;

/// Options for adding a resource.
#[derive(Debug, Clone)]
pub struct AddResourceOptions {
    pub name: String,

    pub kind: ResourceKind,

    /// Listening port (databases default to the engine port)
    pub port: Option<u16>,

    /// Framework tag; for databases the engine name
    pub framework: Option<String>,

    /// Container image override
    pub image: Option<String>,

    /// Bring-up command for `berth run`
    pub command: Option<String>,

    /// Entries for the `options` table
    pub options: Vec<(String, String)>,

    /// Non-secret environment entries
    pub env: Vec<(String, String)>,
}

impl AddResourceOptions {
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Self {
        AddResourceOptions {
            name: name.into(),
            kind,
            port: None,
            framework: None,
            image: None,
            command: None,
            options: Vec::new(),
            env: Vec::new(),
        }
    }

    fn framework(&self) -> String {
        match (&self.framework, self.kind) {
            (Some(framework), _) => framework.clone(),
            (None, ResourceKind::Database) => DatabaseEngine::Postgres.as_str().to_string(),
            (None, ResourceKind::Frontend) => "react".to_string(),
            (None, ResourceKind::Api) => "express".to_string(),
        }
    }

    fn port(&self, framework: &str) -> BerthResult<u16> {
        if let Some(port) = self.port {
            return Ok(port);
        }
        match DatabaseEngine::from_framework(framework) {
            Some(engine) if self.kind.is_database() => Ok(engine.default_port()),
            _ => Err(BerthError::Config(format!(
                "{} `{}` needs a port (--port)",
                self.kind, self.name
            ))),
        }
    }
}

/// Add a resource to the manifest.
pub fn add_resource(ws: &mut Workspace, opts: &AddResourceOptions) -> BerthResult<Resource> {
    let framework = opts.framework();
    let port = opts.port(&framework)?;

    let mut resource = Resource::new(
        opts.name.clone(),
        opts.kind,
        port,
        framework,
        ws.project().name(),
    )?;
    if let Some(image) = &opts.image {
        resource.image = image.clone();
    }
    resource.command = opts.command.clone();
    resource.options.extend(opts.options.iter().cloned());
    resource.env.extend(opts.env.iter().cloned());

    let added = resource.clone();
    ws.update(|project| project.add_resource(resource))?;
    Ok(added)
}

/// Remove a resource, detaching it from every addon.
pub fn remove_resource(ws: &mut Workspace, name: &str) -> BerthResult<Resource> {
    ws.update(|project| project.remove_resource(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::manifest::Project;
    use crate::test_support::{scenario_project, write_project};
    use crate::util::GlobalContext;
    use tempfile::TempDir;

    fn workspace(tmp: &TempDir) -> Workspace {
        let manifest = write_project(tmp.path(), &scenario_project());
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).with_global_config(None);
        Workspace::new(&manifest, &ctx).unwrap()
    }

    #[test]
    fn test_add_database_with_default_port() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp);

        let mut opts = AddResourceOptions::new("cache", ResourceKind::Database);
        opts.framework = Some("mongodb".into());
        let added = add_resource(&mut ws, &opts).unwrap();
        assert_eq!(added.port, 27017);
        assert_eq!(added.image, "mongo:7");

        let reloaded = Project::load(ws.manifest_path()).unwrap();
        assert_eq!(reloaded.resources["cache"].port, 27017);
    }

    #[test]
    fn test_add_app() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp);

        let mut opts = AddResourceOptions::new("web", ResourceKind::Frontend);
        opts.port = Some(3000);
        opts.command = Some("npm run dev".into());
        opts.options.push(("host".into(), "shop.example.com".into()));
        add_resource(&mut ws, &opts).unwrap();

        let web = &ws.project().resources["web"];
        assert_eq!(web.framework, "react");
        assert_eq!(web.option("host"), Some("shop.example.com"));
    }

    #[test]
    fn test_app_needs_port() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp);
        let err = add_resource(&mut ws, &AddResourceOptions::new("web", ResourceKind::Api))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_duplicate_port_leaves_manifest() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp);
        let before = std::fs::read_to_string(ws.manifest_path()).unwrap();

        let mut opts = AddResourceOptions::new("web", ResourceKind::Api);
        opts.port = Some(8080);
        let err = add_resource(&mut ws, &opts).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(std::fs::read_to_string(ws.manifest_path()).unwrap(), before);
    }

    #[test]
    fn test_remove_cascades() {
        let tmp = TempDir::new().unwrap();
        let mut ws = workspace(&tmp);
        remove_resource(&mut ws, "svc").unwrap();

        let reloaded = Project::load(ws.manifest_path()).unwrap();
        assert!(!reloaded.resources.contains_key("svc"));
        assert!(reloaded.addons["auth"].dependencies.is_empty());

        let err = remove_resource(&mut ws, "svc").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
