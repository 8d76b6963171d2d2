//! `berth deploy` and `berth undeploy` commands

use anyhow::{bail, Result};

use crate::cli::DeployArgs;
use crate::GlobalOptions;
use berth::ops::{self, BatchEvent, BatchReport, DeployOptions};
use berth::util::process::SystemExecutor;
use berth::util::shell::{Progress, Shell};
use berth::util::Status;

pub fn execute(args: DeployArgs, global_opts: &GlobalOptions) -> Result<()> {
    run_batch(args, global_opts, true)
}

pub fn execute_undeploy(args: DeployArgs, global_opts: &GlobalOptions) -> Result<()> {
    run_batch(args, global_opts, false)
}

fn deploy_options(args: &DeployArgs) -> DeployOptions {
    DeployOptions {
        names: args.names.clone(),
        all: args.all,
        dry_run: args.dry_run,
    }
}

fn run_batch(args: DeployArgs, global_opts: &GlobalOptions, install: bool) -> Result<()> {
    let ws = super::workspace()?;
    let shell = &global_opts.shell;
    let backend = super::cluster_backend(&ws, args.provider);
    let opts = deploy_options(&args);
    let mut exec = SystemExecutor::new();

    let mut view = BatchView {
        shell,
        progress: None,
        dry_run: opts.dry_run,
    };
    let mut on_event = |event: &BatchEvent| view.handle(event);

    let report = if install {
        ops::deploy(&ws, &opts, backend.as_ref(), &mut exec, &mut on_event)?
    } else {
        ops::undeploy(&ws, &opts, backend.as_ref(), &mut exec, &mut on_event)?
    };

    summarize(&report)
}

/// Renders batch events on the shell.
struct BatchView<'a> {
    shell: &'a std::sync::Arc<Shell>,
    progress: Option<Progress>,
    dry_run: bool,
}

impl BatchView<'_> {
    fn handle(&mut self, event: &BatchEvent) {
        let shell = self.shell;
        shell.json_event(event);

        match event {
            BatchEvent::BatchStarted {
                operation,
                total,
                context,
            } => {
                if let Some(context) = context {
                    shell.verbose(Status::Info, format!("using context `{}`", context));
                }
                if !self.dry_run {
                    self.progress = Some(shell.progress(*total as u64, operation));
                }
            }
            BatchEvent::EntityStarted { operation, name } => {
                let status = if operation == "undeploy" {
                    Status::Undeploying
                } else {
                    Status::Deploying
                };
                self.line(status, format!("`{}`", name));
            }
            BatchEvent::Command { command, .. } => {
                if self.dry_run {
                    shell.print_out(command);
                } else {
                    shell.verbose(Status::Running, command);
                }
            }
            BatchEvent::EntityFinished { .. } => {
                if let Some(progress) = &mut self.progress {
                    progress.inc(1);
                }
            }
            BatchEvent::EntityFailed { name, message, .. } => {
                self.line(Status::Failed, format!("`{}`: {}", name, message));
                if let Some(progress) = &mut self.progress {
                    progress.inc(1);
                }
            }
            BatchEvent::BatchFinished {
                operation,
                succeeded,
                failed,
            } => {
                if let Some(progress) = self.progress.take() {
                    progress.finish();
                }
                let verb = if operation == "undeploy" {
                    "undeployed"
                } else {
                    "deployed"
                };
                if *failed == 0 {
                    shell.status(Status::Finished, format!("{} {}", verb, plural(*succeeded)));
                } else {
                    shell.status(
                        Status::Warning,
                        format!("{} {}, {} failed", verb, plural(*succeeded), failed),
                    );
                }
            }
        }
    }

    fn line(&self, status: Status, msg: String) {
        match &self.progress {
            Some(progress) => progress.println(self.shell, status, msg),
            None => self.shell.status(status, msg),
        }
    }
}

fn plural(n: usize) -> String {
    if n == 1 {
        "1 entity".to_string()
    } else {
        format!("{} entities", n)
    }
}

/// A batch with any failed element fails the command.
fn summarize(report: &BatchReport) -> Result<()> {
    if report.is_success() {
        return Ok(());
    }
    bail!(
        "{} of {} failed: {}",
        report.failed.len(),
        report.failed.len() + report.succeeded.len(),
        report.failed_names().join(", ")
    )
}
