//! `berth resource` commands

use anyhow::Result;

use crate::cli::{ResourceAddArgs, ResourceCommand};
use crate::GlobalOptions;
use berth::core::Workspace;
use berth::ops::{add_resource, remove_resource, AddResourceOptions};
use berth::util::Status;

pub fn execute(cmd: ResourceCommand, global_opts: &GlobalOptions) -> Result<()> {
    let mut ws = super::workspace()?;
    match cmd {
        ResourceCommand::Add(args) => add(&mut ws, args, global_opts),
        ResourceCommand::Remove(args) => {
            let removed = remove_resource(&mut ws, &args.name)?;
            global_opts
                .shell
                .status(Status::Removed, format!("{} `{}`", removed.kind, removed.name));
            global_opts.shell.json_event(&serde_json::json!({
                "reason": "resource-removed",
                "name": removed.name,
            }));
            Ok(())
        }
        ResourceCommand::List => list(&ws, global_opts),
    }
}

fn add_options(args: ResourceAddArgs) -> AddResourceOptions {
    let mut opts = AddResourceOptions::new(args.name, args.kind);
    opts.port = args.port;
    opts.framework = args.framework;
    opts.image = args.image;
    opts.command = args.command;
    opts.options = args.options;
    opts.env = args.env;
    opts
}

fn add(ws: &mut Workspace, args: ResourceAddArgs, global_opts: &GlobalOptions) -> Result<()> {
    let resource = add_resource(ws, &add_options(args))?;

    global_opts.shell.status(
        Status::Added,
        format!(
            "{} `{}` ({}, port {})",
            resource.kind, resource.name, resource.framework, resource.port
        ),
    );
    global_opts.shell.json_event(&serde_json::json!({
        "reason": "resource-added",
        "name": resource.name,
        "kind": resource.kind,
        "port": resource.port,
        "hosts": resource.hosts,
    }));
    Ok(())
}

fn list(ws: &Workspace, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let project = ws.project();

    if project.resources.is_empty() {
        shell.note("no resources; add one with `berth resource add <name> --kind <kind>`");
    }
    for resource in project.resources.values() {
        let addons = if resource.dependents.is_empty() {
            String::new()
        } else {
            format!("  [{}]", resource.dependents.join(", "))
        };
        shell.print_out(format!(
            "{:<16} {:<9} {:<10} {:>5}{}",
            resource.name, resource.kind, resource.framework, resource.port, addons
        ));
        shell.json_event(&serde_json::json!({
            "reason": "resource",
            "name": resource.name,
            "kind": resource.kind,
            "framework": resource.framework,
            "port": resource.port,
            "dependents": resource.dependents,
        }));
    }
    Ok(())
}
