//! `berth tree` command

use anyhow::Result;

use crate::cli::TreeArgs;
use crate::GlobalOptions;
use berth::core::{DependencyGraph, Node};

pub fn execute(args: TreeArgs, global_opts: &GlobalOptions) -> Result<()> {
    let ws = super::workspace()?;
    let shell = &global_opts.shell;
    let graph = DependencyGraph::new(ws.project());

    if args.order {
        for (i, node) in graph.deploy_order().iter().enumerate() {
            shell.print_out(format!("{:>3}. {} ({})", i + 1, node.name(), node_kind(node)));
        }
    } else {
        let tree = graph.render_tree();
        if tree.is_empty() {
            shell.note("the project has no resources or addons");
        } else {
            shell.print_out(tree.trim_end());
        }
    }

    let nodes: Vec<_> = graph
        .deploy_order()
        .iter()
        .map(|node| {
            serde_json::json!({
                "name": node.name(),
                "kind": node_kind(node),
                "upstream": graph.upstream(node.name()).iter().map(|n| n.name()).collect::<Vec<_>>(),
            })
        })
        .collect();
    shell.json_event(&serde_json::json!({
        "reason": "graph",
        "nodes": nodes,
    }));
    Ok(())
}

fn node_kind(node: &Node<'_>) -> &'static str {
    match node {
        Node::Database(_) => "database",
        Node::Addon(_) => "addon",
        Node::App(r) => r.kind.as_str(),
    }
}
