//! Implementation of `berth deploy` and `berth undeploy`.
//!
//! Both are best-effort batches: the manifest is validated and the main
//! cluster activated once up front, then each entity is processed in turn
//! and a failure is recorded without stopping the rest.

use crate::cloud::{ClusterBackend, ClusterContext, ContextSwitcher};
use crate::core::error::{BerthError, BerthResult};
use crate::core::graph::DependencyGraph;
use crate::core::workspace::Workspace;
use crate::ops::events::{BatchEvent, BatchReport, EventSink};
use crate::targets::chart::ChartCompiler;
use crate::util::config::Tools;
use crate::util::process::{Executor, ProcessBuilder};
use crate::wiring::Resolver;

/// Options shared by deploy and undeploy.
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Entities in the order given
    pub names: Vec<String>,

    /// Every entity, databases first (reversed for undeploy)
    pub all: bool,

    /// Report commands without running them or activating a context
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Deploy,
    Undeploy,
}

impl Direction {
    fn operation(&self) -> &'static str {
        match self {
            Direction::Deploy => "deploy",
            Direction::Undeploy => "undeploy",
        }
    }
}

/// Install or upgrade releases on the main cluster.
pub fn deploy(
    ws: &Workspace,
    opts: &DeployOptions,
    backend: &dyn ClusterBackend,
    exec: &mut dyn Executor,
    on_event: EventSink<'_>,
) -> BerthResult<BatchReport> {
    run_batch(ws, opts, backend, exec, on_event, Direction::Deploy)
}

/// Uninstall releases from the main cluster.
pub fn undeploy(
    ws: &Workspace,
    opts: &DeployOptions,
    backend: &dyn ClusterBackend,
    exec: &mut dyn Executor,
    on_event: EventSink<'_>,
) -> BerthResult<BatchReport> {
    run_batch(ws, opts, backend, exec, on_event, Direction::Undeploy)
}

fn run_batch(
    ws: &Workspace,
    opts: &DeployOptions,
    backend: &dyn ClusterBackend,
    exec: &mut dyn Executor,
    on_event: EventSink<'_>,
    direction: Direction,
) -> BerthResult<BatchReport> {
    let project = ws.project();
    let operation = direction.operation();

    project.validate()?;
    let names = select(ws, opts, direction)?;

    let switcher = ContextSwitcher::new(backend);
    let ctx = if opts.dry_run {
        switcher.resolve(project)?
    } else {
        switcher.activate(project, exec)?
    };

    on_event(&BatchEvent::BatchStarted {
        operation: operation.to_string(),
        total: names.len(),
        context: Some(ctx.name.clone()),
    });

    let secrets = ws.secrets();
    let compiler = ChartCompiler::new(project, Resolver::new(project, &secrets), ws.config().chart());
    let tools = ws.config().tools();
    let mut report = BatchReport::default();

    for name in names {
        on_event(&BatchEvent::EntityStarted {
            operation: operation.to_string(),
            name: name.clone(),
        });

        let commands = match direction {
            Direction::Deploy => compiler
                .deployment(&name)
                .map(|d| d.install_commands(&tools.helm, &ctx)),
            Direction::Undeploy => uninstall_commands(&compiler, &name, &tools, &ctx),
        };
        let result = match commands {
            Ok(commands) => run_commands(&name, &commands, opts.dry_run, exec, &mut *on_event),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                on_event(&BatchEvent::EntityFinished {
                    operation: operation.to_string(),
                    name: name.clone(),
                });
                report.succeeded.push(name);
            }
            Err(e) => {
                tracing::warn!("{} of `{}` failed: {}", operation, name, e);
                on_event(&BatchEvent::EntityFailed {
                    operation: operation.to_string(),
                    name: name.clone(),
                    message: e.to_string(),
                });
                report.failed.push((name, e));
            }
        }
    }

    on_event(&BatchEvent::BatchFinished {
        operation: operation.to_string(),
        succeeded: report.succeeded.len(),
        failed: report.failed.len(),
    });
    Ok(report)
}

/// Entity names in processing order.
fn select(ws: &Workspace, opts: &DeployOptions, direction: Direction) -> BerthResult<Vec<String>> {
    if !opts.all {
        if opts.names.is_empty() {
            return Err(BerthError::Config(format!(
                "name at least one resource or addon to {}, or pass --all",
                direction.operation()
            )));
        }
        return Ok(opts.names.clone());
    }

    let mut names: Vec<String> = DependencyGraph::new(ws.project())
        .deploy_order()
        .iter()
        .map(|node| node.name().to_string())
        .collect();
    if direction == Direction::Undeploy {
        names.reverse();
    }
    Ok(names)
}

fn uninstall_commands(
    compiler: &ChartCompiler<'_>,
    name: &str,
    tools: &Tools,
    ctx: &ClusterContext,
) -> BerthResult<Vec<ProcessBuilder>> {
    Ok(compiler
        .removal(name)?
        .iter()
        .flat_map(|release| release.uninstall(&tools.helm, &tools.kubectl, ctx))
        .collect())
}

fn run_commands(
    name: &str,
    commands: &[ProcessBuilder],
    dry_run: bool,
    exec: &mut dyn Executor,
    on_event: EventSink<'_>,
) -> BerthResult<()> {
    for cmd in commands {
        on_event(&BatchEvent::Command {
            name: name.to_string(),
            command: cmd.display_command(),
        });
        if !dry_run {
            exec.run_checked(cmd)?;
        }
    }
    Ok(())
}
