//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use berth::core::{DatabaseEngine, Provider, ResourceKind};
use berth::util::shell::ColorChoice;
use berth::wiring::Target;

/// berth - manifests and deployments for multi-service projects
#[derive(Parser)]
#[command(name = "berth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Print every external command and debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, default_value = "auto", value_name = "WHEN")]
    pub color: ColorChoice,

    /// Output format for messages
    #[arg(long, global = true, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create Berth.toml in an existing directory
    Init(InitArgs),

    /// Manage resources (apis, frontends, databases)
    #[command(subcommand)]
    Resource(ResourceCommand),

    /// Manage addons and their attachments
    #[command(subcommand)]
    Addon(AddonCommand),

    /// Print the resolved environment of a resource or addon
    Env(EnvArgs),

    /// Display the resource/addon graph
    Tree(TreeArgs),

    /// Manage clusters
    #[command(subcommand)]
    Cluster(ClusterCommand),

    /// Run a resource locally with its wiring
    Run(RunArgs),

    /// Write docker-compose.yml and bring it up
    Test(TestArgs),

    /// Install or upgrade releases on the main cluster
    Deploy(DeployArgs),

    /// Uninstall releases from the main cluster
    Undeploy(DeployArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Project name (defaults to directory name)
    #[arg(long)]
    pub name: Option<String>,

    /// Provider of the initial cloud config
    #[arg(long, default_value = "gcp")]
    pub provider: Provider,

    /// Directory to initialize (defaults to current directory)
    pub path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum ResourceCommand {
    /// Add a resource to Berth.toml
    Add(ResourceAddArgs),

    /// Remove a resource, detaching it from every addon
    Remove(NameArgs),

    /// List resources
    List,
}

#[derive(Args)]
pub struct ResourceAddArgs {
    /// Resource name
    pub name: String,

    /// Resource kind: api, frontend, database
    #[arg(long, short = 'k')]
    pub kind: ResourceKind,

    /// Listening port (databases default to the engine port)
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Framework tag; the engine name for databases
    #[arg(long)]
    pub framework: Option<String>,

    /// Container image
    #[arg(long)]
    pub image: Option<String>,

    /// Command used by `berth run` ({port} and {name} are substituted)
    #[arg(long)]
    pub command: Option<String>,

    /// Option entry (KEY=VALUE), e.g. host=shop.example.com
    #[arg(long = "option", short = 'o', value_parser = parse_key_value)]
    pub options: Vec<(String, String)>,

    /// Environment entry (KEY=VALUE)
    #[arg(long, short = 'e', value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,
}

#[derive(Args)]
pub struct NameArgs {
    pub name: String,
}

#[derive(Subcommand)]
pub enum AddonCommand {
    /// Enable an addon
    Enable(AddonEnableArgs),

    /// Disable an addon, detaching it from every resource
    Disable(NameArgs),

    /// Attach an addon to resources
    Attach(AttachArgs),

    /// Detach an addon from resources
    Detach(AttachArgs),

    /// List addons
    List,
}

#[derive(Args)]
pub struct AddonEnableArgs {
    /// Addon name
    pub name: String,

    /// Listening port
    #[arg(long, short = 'p')]
    pub port: u16,

    /// Container image (defaults to {project}-{name}:latest)
    #[arg(long)]
    pub image: Option<String>,

    /// Resources the addon serves
    #[arg(long, value_delimiter = ',')]
    pub serves: Vec<String>,

    /// Environment entry (KEY=VALUE)
    #[arg(long, short = 'e')]
    pub env: Vec<String>,

    /// Engine of the addon's own data store
    #[arg(long)]
    pub database: Option<DatabaseEngine>,

    /// Port of the addon's data store
    #[arg(long, requires = "database")]
    pub database_port: Option<u16>,
}

#[derive(Args)]
pub struct AttachArgs {
    /// Addon name
    pub addon: String,

    /// Resource names
    #[arg(required = true)]
    pub resources: Vec<String>,
}

#[derive(Args)]
pub struct EnvArgs {
    /// Resource or addon name
    pub name: String,

    /// Target: run, test, deploy
    #[arg(long, short = 't', default_value = "run")]
    pub target: Target,
}

#[derive(Args)]
pub struct TreeArgs {
    /// Print the deploy order instead of the tree
    #[arg(long)]
    pub order: bool,
}

#[derive(Subcommand)]
pub enum ClusterCommand {
    /// Create a cluster (the first one becomes main)
    Provision(ClusterArgs),

    /// Delete a cluster
    Delete(ClusterArgs),

    /// Scale a cluster to zero nodes
    Pause(ClusterArgs),

    /// Scale a paused cluster back up
    Start(ClusterArgs),

    /// Make a cluster the main one
    Use(ClusterArgs),

    /// List known clusters
    List,
}

#[derive(Args)]
pub struct ClusterArgs {
    /// Cluster name
    pub name: String,

    /// Cloud provider (defaults to deploy.provider in config)
    #[arg(long)]
    pub provider: Option<Provider>,
}

#[derive(Args)]
pub struct RunArgs {
    /// Resource to run
    pub resource: String,

    /// Print the command without running it
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct TestArgs {
    /// Only write docker-compose.yml
    #[arg(long)]
    pub no_up: bool,
}

#[derive(Args)]
pub struct DeployArgs {
    /// Resources and addons, processed in the order given
    pub names: Vec<String>,

    /// Every resource and addon (databases first)
    #[arg(long, conflicts_with = "names")]
    pub all: bool,

    /// Print the commands without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Cloud provider (defaults to deploy.provider in config)
    #[arg(long)]
    pub provider: Option<Provider>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

/// Parse a `KEY=VALUE` argument.
fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{}`", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("host=shop.example.com").unwrap(),
            ("host".to_string(), "shop.example.com".to_string())
        );
        assert_eq!(
            parse_key_value("URL=a=b").unwrap(),
            ("URL".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["berth", "--message-format", "json", "tree"]);
        assert_eq!(cli.message_format, MessageFormat::Json);
        assert_eq!(cli.color, ColorChoice::Auto);

        let cli = Cli::parse_from(["berth", "tree", "-v", "--color", "never"]);
        assert!(cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["berth", "-q", "-v", "tree"]).is_err());
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
