//! `berth test` command

use anyhow::Result;

use crate::cli::TestArgs;
use crate::GlobalOptions;
use berth::ops::{test, TestOptions};
use berth::util::process::SystemExecutor;
use berth::util::Status;

pub fn execute(args: TestArgs, global_opts: &GlobalOptions) -> Result<()> {
    let ws = super::workspace()?;
    let shell = &global_opts.shell;
    let opts = TestOptions { no_up: args.no_up };

    if !opts.no_up {
        shell.status(Status::Running, "docker compose up");
    }
    let report = test(&ws, &opts, &mut SystemExecutor::new())?;

    for (name, error) in &report.failed {
        shell.status(Status::Skipped, format!("`{}`: {}", name, error));
    }
    shell.status(
        Status::Writing,
        format!(
            "{} ({} services)",
            report.compose_path.display(),
            report.added.len()
        ),
    );
    shell.json_event(&serde_json::json!({
        "reason": "compose-written",
        "path": report.compose_path,
        "services": report.added,
        "skipped": report
            .failed
            .iter()
            .map(|(name, e)| serde_json::json!({ "name": name, "message": e.to_string() }))
            .collect::<Vec<_>>(),
    }));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_test_args() {
        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            test: TestArgs,
        }
        assert!(!TestCli::parse_from(["test"]).test.no_up);
        assert!(TestCli::parse_from(["test", "--no-up"]).test.no_up);
    }
}
