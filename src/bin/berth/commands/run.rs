//! `berth run` command

use anyhow::Result;

use crate::cli::RunArgs;
use crate::GlobalOptions;
use berth::ops::{run, RunOptions};
use berth::util::process::SystemExecutor;
use berth::util::Status;

pub fn execute(args: RunArgs, global_opts: &GlobalOptions) -> Result<()> {
    let ws = super::workspace()?;
    let shell = &global_opts.shell;
    let opts = RunOptions {
        resource: args.resource,
        dry_run: args.dry_run,
    };

    if opts.dry_run {
        let invocation = run(&ws, &opts, &mut SystemExecutor::new())?;
        shell.print_out(format!(
            "cd {} && {}",
            invocation.cwd.display(),
            invocation.shell_line()
        ));
        shell.json_event(&serde_json::json!({
            "reason": "run-plan",
            "resource": invocation.resource,
            "cwd": invocation.cwd,
            "command": invocation.command,
            "env": invocation.env.to_map(),
        }));
        return Ok(());
    }

    shell.status(Status::Running, format!("`{}`", opts.resource));
    run(&ws, &opts, &mut SystemExecutor::new())?;
    Ok(())
}
