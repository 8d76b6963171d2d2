//! Resource/addon dependency graph.
//!
//! Edges are stored twice in the manifest, as name lists on both ends:
//! `addon.dependencies` names the resources an addon serves and
//! `resource.dependents` names the addons attached to a resource. The
//! mutations here keep both lists in step; [`Project::validate`] rejects any
//! document where they disagree.
//!
//! [`DependencyGraph`] is a read-only petgraph view used for `berth tree` and
//! for ordering cluster deployments.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::core::addon::Addon;
use crate::core::error::{BerthError, BerthResult};
use crate::core::manifest::Project;
use crate::core::resource::Resource;

impl Project {
    /// Add a resource, rejecting duplicate names and ports.
    pub fn add_resource(&mut self, resource: Resource) -> BerthResult<()> {
        self.check_new_entity(&resource.name, resource.port)?;
        if resource.is_database() && resource.command.is_some() {
            return Err(BerthError::conflict(format!(
                "database `{}` cannot have a bring-up command",
                resource.name
            )));
        }
        tracing::info!("adding {} `{}` on port {}", resource.kind, resource.name, resource.port);
        self.resources.insert(resource.name.clone(), resource);
        Ok(())
    }

    /// Remove a resource, detaching it from every addon first.
    pub fn remove_resource(&mut self, name: &str) -> BerthResult<Resource> {
        self.resource(name)?;
        for addon in self.addons.values_mut() {
            addon.dependencies.retain(|r| r != name);
        }
        let removed = self
            .resources
            .shift_remove(name)
            .ok_or_else(|| BerthError::not_found("resource", name))?;
        tracing::info!("removed resource `{}`", name);
        Ok(removed)
    }

    /// Enable an addon, attaching it to the given resources.
    pub fn enable_addon(&mut self, addon: Addon, serves: &[String]) -> BerthResult<()> {
        self.check_new_entity(&addon.name, addon.port)?;
        if let Some(db) = &addon.database {
            if let Some(owner) = self.port_owner(db.port) {
                return Err(BerthError::conflict(format!(
                    "port {} is already used by `{}`",
                    db.port, owner
                )));
            }
            if db.port == addon.port {
                return Err(BerthError::conflict(format!(
                    "addon `{}` and its database cannot share port {}",
                    addon.name, addon.port
                )));
            }
        }
        for resource in serves {
            self.check_attachable(resource)?;
        }

        let name = addon.name.clone();
        tracing::info!("enabling addon `{}` on port {}", name, addon.port);
        self.addons.insert(name.clone(), addon);
        for resource in serves {
            self.attach(&name, resource)?;
        }
        Ok(())
    }

    /// Disable an addon, removing it from every resource's dependents.
    pub fn disable_addon(&mut self, name: &str) -> BerthResult<Addon> {
        self.addon(name)?;
        for resource in self.resources.values_mut() {
            resource.dependents.retain(|a| a != name);
        }
        let removed = self
            .addons
            .shift_remove(name)
            .ok_or_else(|| BerthError::not_found("addon", name))?;
        tracing::info!("disabled addon `{}`", name);
        Ok(removed)
    }

    /// Attach an addon to a resource. Attaching twice is a no-op.
    ///
    /// Returns whether a new edge was created.
    pub fn attach(&mut self, addon_name: &str, resource_name: &str) -> BerthResult<bool> {
        self.addon(addon_name)?;
        self.check_attachable(resource_name)?;

        let mut added = false;
        if let Some(addon) = self.addons.get_mut(addon_name) {
            if !addon.dependencies.iter().any(|r| r == resource_name) {
                addon.dependencies.push(resource_name.to_string());
                added = true;
            }
        }
        if let Some(resource) = self.resources.get_mut(resource_name) {
            if !resource.dependents.iter().any(|a| a == addon_name) {
                resource.dependents.push(addon_name.to_string());
                added = true;
            }
        }
        if added {
            tracing::info!("attached addon `{}` to `{}`", addon_name, resource_name);
        }
        Ok(added)
    }

    /// Detach an addon from a resource. Detaching a missing edge is a no-op.
    ///
    /// Returns whether an edge was removed.
    pub fn detach(&mut self, addon_name: &str, resource_name: &str) -> BerthResult<bool> {
        self.addon(addon_name)?;
        self.resource(resource_name)?;

        let mut removed = false;
        if let Some(addon) = self.addons.get_mut(addon_name) {
            let before = addon.dependencies.len();
            addon.dependencies.retain(|r| r != resource_name);
            removed |= addon.dependencies.len() != before;
        }
        if let Some(resource) = self.resources.get_mut(resource_name) {
            let before = resource.dependents.len();
            resource.dependents.retain(|a| a != addon_name);
            removed |= resource.dependents.len() != before;
        }
        if removed {
            tracing::info!("detached addon `{}` from `{}`", addon_name, resource_name);
        }
        Ok(removed)
    }

    fn check_new_entity(&self, name: &str, port: u16) -> BerthResult<()> {
        if self.name_taken(name) {
            return Err(BerthError::conflict(format!(
                "a resource or addon named `{}` already exists",
                name
            )));
        }
        if let Some(owner) = self.port_owner(port) {
            return Err(BerthError::conflict(format!(
                "port {} is already used by `{}`",
                port, owner
            )));
        }
        Ok(())
    }

    fn check_attachable(&self, resource_name: &str) -> BerthResult<()> {
        let resource = self.resource(resource_name)?;
        if resource.is_database() {
            return Err(BerthError::conflict(format!(
                "addons cannot be attached to database `{}`",
                resource_name
            )));
        }
        Ok(())
    }
}

/// A node of the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node<'a> {
    Database(&'a Resource),
    App(&'a Resource),
    Addon(&'a Addon),
}

impl<'a> Node<'a> {
    pub fn name(&self) -> &'a str {
        match *self {
            Node::Database(r) | Node::App(r) => &r.name,
            Node::Addon(a) => &a.name,
        }
    }
}

/// Directed graph view of a project.
///
/// An edge `a -> b` means `b` connects to `a` at runtime: every app and
/// addon depends on every database, and each app depends on its addons.
pub struct DependencyGraph<'a> {
    graph: DiGraph<Node<'a>, ()>,
    order: Vec<NodeIndex>,
}

impl<'a> DependencyGraph<'a> {
    pub fn new(project: &'a Project) -> Self {
        let mut graph = DiGraph::new();
        let mut order = Vec::new();

        let databases: Vec<NodeIndex> = project
            .databases()
            .map(|r| graph.add_node(Node::Database(r)))
            .collect();
        let addons: Vec<NodeIndex> = project
            .addons
            .values()
            .map(|a| graph.add_node(Node::Addon(a)))
            .collect();
        let apps: Vec<NodeIndex> = project
            .apps()
            .map(|r| graph.add_node(Node::App(r)))
            .collect();

        for &dependent in addons.iter().chain(apps.iter()) {
            for &db in &databases {
                graph.add_edge(db, dependent, ());
            }
        }
        for &app in &apps {
            let Node::App(resource) = graph[app] else {
                continue;
            };
            for addon_name in &resource.dependents {
                if let Some(pos) = project.addons.get_index_of(addon_name) {
                    graph.add_edge(addons[pos], app, ());
                }
            }
        }

        order.extend(databases);
        order.extend(addons);
        order.extend(apps);
        DependencyGraph { graph, order }
    }

    /// Every node in deployment order (databases, addons, apps), each tier
    /// in manifest order.
    pub fn deploy_order(&self) -> Vec<Node<'a>> {
        self.order.iter().map(|&idx| self.graph[idx]).collect()
    }

    /// Nodes that `name` connects to (its databases and addons).
    pub fn upstream(&self, name: &str) -> Vec<Node<'a>> {
        self.neighbors(name, Direction::Incoming)
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<Node<'a>> {
        let Some(&idx) = self.order.iter().find(|&&idx| self.graph[idx].name() == name) else {
            return Vec::new();
        };
        let mut found: Vec<NodeIndex> = self.graph.neighbors_directed(idx, direction).collect();
        // petgraph walks edges newest first
        found.sort_by_key(|n| self.order.iter().position(|o| o == n));
        found.into_iter().map(|n| self.graph[n]).collect()
    }

    /// Render the graph as an indented tree, one app or addon per root.
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        for node in self.deploy_order() {
            let label = match node {
                Node::Database(r) => format!("{} (database, {}, :{})", r.name, r.framework, r.port),
                Node::Addon(a) => match &a.database {
                    Some(db) => format!("{} (addon, :{}, {} store)", a.name, a.port, db.engine),
                    None => format!("{} (addon, :{})", a.name, a.port),
                },
                Node::App(r) => format!("{} ({}, {}, :{})", r.name, r.kind, r.framework, r.port),
            };
            out.push_str(&label);
            out.push('\n');

            let upstream = self.upstream(node.name());
            for (i, dep) in upstream.iter().enumerate() {
                let branch = if i + 1 == upstream.len() { "└──" } else { "├──" };
                out.push_str(&format!("{} {}\n", branch, dep.name()));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cloud::Provider;
    use crate::core::error::ErrorKind;
    use crate::core::resource::ResourceKind;

    fn project() -> Project {
        let mut p = Project::new("shop", Provider::Gcp).unwrap();
        p.add_resource(Resource::new("svc", ResourceKind::Api, 8080, "express", "shop").unwrap())
            .unwrap();
        p.add_resource(Resource::new("web", ResourceKind::Frontend, 3000, "react", "shop").unwrap())
            .unwrap();
        p.add_resource(
            Resource::new("store", ResourceKind::Database, 5432, "postgres", "shop").unwrap(),
        )
        .unwrap();
        p.enable_addon(Addon::new("auth", 9000, "berth/auth", "shop").unwrap(), &[])
            .unwrap();
        p
    }

    fn assert_symmetric(p: &Project) {
        for addon in p.addons.values() {
            for r in &addon.dependencies {
                assert!(p.resources[r.as_str()].dependents.contains(&addon.name));
            }
        }
        for resource in p.resources.values() {
            for a in &resource.dependents {
                assert!(p.addons[a.as_str()].dependencies.contains(&resource.name));
            }
        }
    }

    #[test]
    fn test_attach_is_symmetric_and_idempotent() {
        let mut p = project();
        assert!(p.attach("auth", "svc").unwrap());
        assert!(!p.attach("auth", "svc").unwrap());
        assert!(p.attach("auth", "web").unwrap());
        assert_eq!(p.addons["auth"].dependencies, vec!["svc", "web"]);
        assert_eq!(p.resources["svc"].dependents, vec!["auth"]);
        assert_symmetric(&p);
        p.validate().unwrap();

        assert!(p.detach("auth", "svc").unwrap());
        assert!(!p.detach("auth", "svc").unwrap());
        assert_eq!(p.addons["auth"].dependencies, vec!["web"]);
        assert_symmetric(&p);
    }

    #[test]
    fn test_attach_unknown_names() {
        let mut p = project();
        assert_eq!(p.attach("auth", "ghost").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(p.attach("ghost", "svc").unwrap_err().kind(), ErrorKind::NotFound);
        assert!(p.addons["auth"].dependencies.is_empty());
    }

    #[test]
    fn test_attach_to_database_rejected() {
        let mut p = project();
        assert_eq!(p.attach("auth", "store").unwrap_err().kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_remove_resource_cascades() {
        let mut p = project();
        p.attach("auth", "svc").unwrap();
        p.attach("auth", "web").unwrap();
        p.remove_resource("svc").unwrap();
        assert_eq!(p.addons["auth"].dependencies, vec!["web"]);
        p.validate().unwrap();
    }

    #[test]
    fn test_disable_addon_cascades() {
        let mut p = project();
        p.attach("auth", "svc").unwrap();
        p.disable_addon("auth").unwrap();
        assert!(p.resources["svc"].dependents.is_empty());
        p.validate().unwrap();
    }

    #[test]
    fn test_duplicate_name_and_port() {
        let mut p = project();
        let dup = Resource::new("auth", ResourceKind::Api, 8081, "express", "shop").unwrap();
        assert_eq!(p.add_resource(dup).unwrap_err().kind(), ErrorKind::Conflict);
        let port = Resource::new("other", ResourceKind::Api, 9000, "express", "shop").unwrap();
        assert_eq!(p.add_resource(port).unwrap_err().kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_enable_addon_with_unknown_resource_adds_nothing() {
        let mut p = project();
        let addon = Addon::new("mail", 9100, "berth/mail", "shop").unwrap();
        let err = p.enable_addon(addon, &["ghost".to_string()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!p.addons.contains_key("mail"));
    }

    #[test]
    fn test_deploy_order() {
        let mut p = project();
        p.attach("auth", "svc").unwrap();
        let graph = DependencyGraph::new(&p);
        let names: Vec<_> = graph.deploy_order().iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["store", "auth", "svc", "web"]);

        let upstream: Vec<_> = graph.upstream("svc").iter().map(|n| n.name()).collect();
        assert_eq!(upstream, vec!["store", "auth"]);
    }

    #[test]
    fn test_render_tree() {
        let mut p = project();
        p.attach("auth", "svc").unwrap();
        let tree = DependencyGraph::new(&p).render_tree();
        assert!(tree.contains("svc (api, express, :8080)"));
        assert!(tree.contains("└── auth"));
    }
}
