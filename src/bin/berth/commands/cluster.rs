//! `berth cluster` commands

use anyhow::Result;

use crate::cli::{ClusterArgs, ClusterCommand};
use crate::GlobalOptions;
use berth::core::Workspace;
use berth::ops::berth_cluster::{self, ClusterChange};
use berth::ops::list_clusters;
use berth::util::process::SystemExecutor;
use berth::util::Status;

pub fn execute(cmd: ClusterCommand, global_opts: &GlobalOptions) -> Result<()> {
    let mut ws = super::workspace()?;
    let shell = &global_opts.shell;
    let mut exec = SystemExecutor::new();

    match cmd {
        ClusterCommand::Provision(args) => {
            let backend = super::cluster_backend(&ws, args.provider);
            let span = shell.span(
                Status::Provisioning,
                format!("{} cluster `{}`", backend.provider(), args.name),
            );
            let change = berth_cluster::provision(&mut ws, backend.as_ref(), &args.name, &mut exec)?;
            span.finish_with_message(format!("provisioned `{}`", change.cluster));
            report(global_opts, "provisioned", &args, &change);
        }
        ClusterCommand::Delete(args) => {
            let backend = super::cluster_backend(&ws, args.provider);
            let span = shell.span(
                Status::Deleting,
                format!("{} cluster `{}`", backend.provider(), args.name),
            );
            let change = berth_cluster::delete(&mut ws, backend.as_ref(), &args.name, &mut exec)?;
            span.finish_with_message(format!("deleted `{}`", change.cluster));
            report(global_opts, "deleted", &args, &change);
        }
        ClusterCommand::Pause(args) => {
            let backend = super::cluster_backend(&ws, args.provider);
            let change = berth_cluster::pause(&mut ws, backend.as_ref(), &args.name, &mut exec)?;
            shell.status(Status::Updated, format!("`{}` paused", change.cluster));
            report(global_opts, "paused", &args, &change);
        }
        ClusterCommand::Start(args) => {
            let backend = super::cluster_backend(&ws, args.provider);
            let change = berth_cluster::start(&mut ws, backend.as_ref(), &args.name, &mut exec)?;
            shell.status(Status::Updated, format!("`{}` started", change.cluster));
            report(global_opts, "started", &args, &change);
        }
        ClusterCommand::Use(args) => {
            let backend = super::cluster_backend(&ws, args.provider);
            let change = berth_cluster::use_cluster(&mut ws, backend.as_ref(), &args.name)?;
            shell.status(Status::Switching, format!("main cluster is now `{}`", change.main));
            report(global_opts, "selected", &args, &change);
        }
        ClusterCommand::List => list(&ws, global_opts),
    }
    Ok(())
}

fn report(global_opts: &GlobalOptions, action: &str, args: &ClusterArgs, change: &ClusterChange) {
    let shell = &global_opts.shell;
    if change.main.is_empty() {
        shell.note("no main cluster; deploys need `berth cluster provision <name>`");
    } else if change.main != change.cluster && action != "selected" {
        shell.verbose(Status::Info, format!("main cluster: `{}`", change.main));
    }
    shell.json_event(&serde_json::json!({
        "reason": "cluster",
        "action": action,
        "provider": args.provider.map(|p| p.as_str()),
        "cluster": change.cluster,
        "main": change.main,
    }));
}

fn list(ws: &Workspace, global_opts: &GlobalOptions) {
    let shell = &global_opts.shell;
    let clusters = list_clusters(ws);

    if clusters.is_empty() {
        shell.note("no clusters; create one with `berth cluster provision <name>`");
    }
    for entry in &clusters {
        let marker = if entry.main { "*" } else { " " };
        shell.print_out(format!(
            "{} {:<14} {:<20} {}",
            marker, entry.provider, entry.name, entry.state
        ));
        shell.json_event(&serde_json::json!({
            "reason": "cluster-entry",
            "provider": entry.provider,
            "name": entry.name,
            "state": entry.state.to_string(),
            "main": entry.main,
        }));
    }
}
