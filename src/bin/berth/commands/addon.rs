//! `berth addon` commands

use anyhow::Result;

use crate::cli::{AddonCommand, AddonEnableArgs};
use crate::GlobalOptions;
use berth::core::Workspace;
use berth::ops::{attach, detach, disable_addon, enable_addon, EnableAddonOptions};
use berth::util::Status;

pub fn execute(cmd: AddonCommand, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let mut ws = super::workspace()?;

    match cmd {
        AddonCommand::Enable(args) => {
            let addon = enable_addon(&mut ws, &enable_options(args))?;
            let serves = if addon.dependencies.is_empty() {
                String::new()
            } else {
                format!(", serving {}", addon.dependencies.join(", "))
            };
            shell.status(
                Status::Added,
                format!("addon `{}` (port {}{})", addon.name, addon.port, serves),
            );
            shell.json_event(&serde_json::json!({
                "reason": "addon-enabled",
                "name": addon.name,
                "port": addon.port,
                "dependencies": addon.dependencies,
            }));
        }
        AddonCommand::Disable(args) => {
            let addon = disable_addon(&mut ws, &args.name)?;
            shell.status(Status::Removed, format!("addon `{}`", addon.name));
            shell.json_event(&serde_json::json!({
                "reason": "addon-disabled",
                "name": addon.name,
            }));
        }
        AddonCommand::Attach(args) => {
            let added = attach(&mut ws, &args.addon, &args.resources)?;
            report_edges(global_opts, Status::Attached, &args.addon, &args.resources, added);
        }
        AddonCommand::Detach(args) => {
            let removed = detach(&mut ws, &args.addon, &args.resources)?;
            report_edges(global_opts, Status::Detached, &args.addon, &args.resources, removed);
        }
        AddonCommand::List => list(&ws, global_opts),
    }
    Ok(())
}

fn enable_options(args: AddonEnableArgs) -> EnableAddonOptions {
    let mut opts = EnableAddonOptions::new(args.name, args.port);
    opts.image = args.image;
    opts.serves = args.serves;
    opts.env = args.env;
    opts.database = args.database;
    opts.database_port = args.database_port;
    opts
}

fn report_edges(
    global_opts: &GlobalOptions,
    status: Status,
    addon: &str,
    resources: &[String],
    changed: usize,
) {
    let shell = &global_opts.shell;
    if changed == 0 {
        shell.status(Status::Skipped, format!("`{}`: nothing to change", addon));
    } else {
        shell.status(
            status,
            format!("`{}` ({} of {}: {})", addon, changed, resources.len(), resources.join(", ")),
        );
    }
    shell.json_event(&serde_json::json!({
        "reason": if status == Status::Attached { "addon-attached" } else { "addon-detached" },
        "addon": addon,
        "resources": resources,
        "changed": changed,
    }));
}

fn list(ws: &Workspace, global_opts: &GlobalOptions) {
    let shell = &global_opts.shell;
    let project = ws.project();

    if project.addons.is_empty() {
        shell.note("no addons; enable one with `berth addon enable <name> --port <port>`");
    }
    for addon in project.addons.values() {
        let store = addon
            .database
            .as_ref()
            .map(|db| format!("  {} store :{}", db.engine, db.port))
            .unwrap_or_default();
        shell.print_out(format!(
            "{:<16} {:>5}  -> {}{}",
            addon.name,
            addon.port,
            if addon.dependencies.is_empty() {
                "(unattached)".to_string()
            } else {
                addon.dependencies.join(", ")
            },
            store
        ));
        shell.json_event(&serde_json::json!({
            "reason": "addon",
            "name": addon.name,
            "port": addon.port,
            "image": addon.image,
            "dependencies": addon.dependencies,
            "database": addon.database,
        }));
    }
}
