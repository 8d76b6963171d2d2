//! Test fixtures for common project shapes.

use std::path::Path;

use crate::core::addon::Addon;
use crate::core::cloud::Provider;
use crate::core::manifest::Project;
use crate::core::resource::{Resource, ResourceKind};

/// The reference project: api `svc` on 8080, postgres `store` on 5432 and
/// addon `auth` on 9000 attached to `svc`.
pub fn scenario_project() -> Project {
    let mut project = Project::new("shop", Provider::Gcp).expect("valid project name");
    let mut svc =
        Resource::new("svc", ResourceKind::Api, 8080, "express", "shop").expect("valid resource");
    svc.command = Some("npm start".into());
    project.add_resource(svc).expect("add svc");
    project
        .add_resource(
            Resource::new("store", ResourceKind::Database, 5432, "postgres", "shop")
                .expect("valid database"),
        )
        .expect("add store");
    project
        .enable_addon(
            Addon::new("auth", 9000, "berth/auth:latest", "shop").expect("valid addon"),
            &["svc".to_string()],
        )
        .expect("enable auth");
    project
}

/// Scenario project plus a frontend `web` with an ingress host.
pub fn full_project() -> Project {
    let mut project = scenario_project();
    let mut web = Resource::new("web", ResourceKind::Frontend, 3000, "react", "shop")
        .expect("valid frontend");
    web.command = Some("npm run dev -- --port {port}".into());
    web.options.insert("host".into(), "shop.example.com".into());
    project.add_resource(web).expect("add web");
    project
}

/// Write `project` as `Berth.toml` inside `dir` and return the manifest path.
pub fn write_project(dir: &Path, project: &Project) -> std::path::PathBuf {
    let path = dir.join("Berth.toml");
    project.save(&path).expect("failed to write manifest");
    path
}

/// Minimal Berth.toml content.
pub fn minimal_manifest(name: &str) -> String {
    format!(
        r#"[project]
name = "{}"
version = "0.1.0"

[[cloud]]
provider = "gcp"
clusters = []
main = ""
"#,
        name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_manifest_parses() {
        let content = minimal_manifest("shop");
        let project = Project::parse(&content, Path::new("Berth.toml")).unwrap();
        assert_eq!(project.name(), "shop");
        assert!(project.cloud(Provider::Gcp).is_some());
    }

    #[test]
    fn test_fixtures_are_valid() {
        scenario_project().validate().unwrap();
        full_project().validate().unwrap();
    }
}
