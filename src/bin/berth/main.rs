//! berth CLI - manifests and deployments for multi-service projects

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use berth::util::diagnostic;
use berth::util::shell::Shell;
use berth::BerthError;
use cli::{Cli, Commands, MessageFormat};

/// Options every command receives.
pub struct GlobalOptions {
    pub shell: Arc<Shell>,
}

fn main() {
    let cli = Cli::parse();
    let shell = Arc::new(Shell::from_flags(
        cli.quiet,
        cli.verbose,
        cli.color,
        cli.message_format == MessageFormat::Json,
    ));

    init_logging(cli.verbose);

    let opts = GlobalOptions {
        shell: Arc::clone(&shell),
    };
    if let Err(e) = run(cli.command, &opts) {
        report(&shell, &e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "berth=debug" } else { "berth=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(command: Commands, opts: &GlobalOptions) -> Result<()> {
    match command {
        Commands::Init(args) => commands::init::execute(args, opts),
        Commands::Resource(cmd) => commands::resource::execute(cmd, opts),
        Commands::Addon(cmd) => commands::addon::execute(cmd, opts),
        Commands::Env(args) => commands::env::execute(args, opts),
        Commands::Tree(args) => commands::tree::execute(args, opts),
        Commands::Cluster(cmd) => commands::cluster::execute(cmd, opts),
        Commands::Run(args) => commands::run::execute(args, opts),
        Commands::Test(args) => commands::test::execute(args, opts),
        Commands::Deploy(args) => commands::deploy::execute(args, opts),
        Commands::Undeploy(args) => commands::deploy::execute_undeploy(args, opts),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Print a failed command's error. Library errors get their suggestions.
fn report(shell: &Shell, error: &anyhow::Error) {
    if shell.is_json() {
        shell.error(format!("{:#}", error));
        return;
    }
    match error.downcast_ref::<BerthError>() {
        Some(e) => diagnostic::emit(&e.to_diagnostic(), shell.use_color()),
        None => shell.error(format!("{:#}", error)),
    }
}
