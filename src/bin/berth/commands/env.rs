//! `berth env` command

use anyhow::Result;

use crate::cli::EnvArgs;
use crate::GlobalOptions;
use berth::ops::resolve_env;
use berth::util::process::shell_quote;

pub fn execute(args: EnvArgs, global_opts: &GlobalOptions) -> Result<()> {
    let ws = super::workspace()?;
    let wiring = resolve_env(&ws, &args.name, args.target)?;
    let shell = &global_opts.shell;

    for (key, value) in wiring.iter() {
        shell.print_out(format!("{}={}", key, shell_quote(value)));
    }
    shell.json_event(&serde_json::json!({
        "reason": "env",
        "name": args.name,
        "target": args.target.as_str(),
        "env": wiring.to_map(),
    }));
    Ok(())
}
