//! Implementation of `berth run` and `berth env`.

use crate::core::error::BerthResult;
use crate::core::workspace::Workspace;
use crate::targets::local::{self, LocalInvocation};
use crate::util::process::Executor;
use crate::wiring::{Resolver, Target, Wiring};

/// Resolved wiring for a resource or addon.
pub fn resolve_env(ws: &Workspace, name: &str, target: Target) -> BerthResult<Wiring> {
    let secrets = ws.secrets();
    Resolver::new(ws.project(), &secrets).resolve(name, target)
}

/// Options for `berth run`.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub resource: String,

    /// Only compile the invocation
    pub dry_run: bool,
}

/// Compile and, unless this is a dry run, run a resource locally with the
/// terminal attached.
pub fn run(
    ws: &Workspace,
    opts: &RunOptions,
    exec: &mut dyn Executor,
) -> BerthResult<LocalInvocation> {
    let resource = ws.project().resource(&opts.resource)?;
    let secrets = ws.secrets();
    let resolver = Resolver::new(ws.project(), &secrets);
    let invocation = local::compile(&resolver, resource, ws.root())?;

    if !opts.dry_run {
        exec.run_attached_checked(&invocation.to_process())?;
    }
    Ok(invocation)
}
