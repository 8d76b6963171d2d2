//! `berth init` command

use anyhow::Result;

use crate::cli::InitArgs;
use crate::GlobalOptions;
use berth::ops::{init_project, InitOptions};
use berth::util::{GlobalContext, Status};

pub fn execute(args: InitArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let ctx = GlobalContext::new()?;
    let root = match args.path {
        Some(path) if path.is_absolute() => path,
        Some(path) => ctx.cwd().join(path),
        None => ctx.cwd().to_path_buf(),
    };

    let opts = InitOptions {
        name: args.name,
        provider: args.provider,
    };
    let manifest_path = init_project(&root, &opts)?;

    shell.status(
        Status::Created,
        format!("berth project in `{}`", root.display()),
    );
    shell.json_event(&serde_json::json!({
        "reason": "project-created",
        "manifest": manifest_path,
        "provider": opts.provider.as_str(),
    }));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use berth::core::Provider;
    use clap::Parser;
    use std::path::PathBuf;

    fn parse_init_args(args: &[&str]) -> InitArgs {
        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            init: InitArgs,
        }
        TestCli::parse_from(args).init
    }

    #[test]
    fn test_init_args_defaults() {
        let args = parse_init_args(&["test"]);
        assert!(args.name.is_none());
        assert!(args.path.is_none());
        assert_eq!(args.provider, Provider::Gcp);
    }

    #[test]
    fn test_init_with_name_and_path() {
        let args = parse_init_args(&["test", "--name", "shop", "apps/shop"]);
        assert_eq!(args.name.as_deref(), Some("shop"));
        assert_eq!(args.path, Some(PathBuf::from("apps/shop")));
    }

    #[test]
    fn test_init_provider_aliases() {
        let args = parse_init_args(&["test", "--provider", "do"]);
        assert_eq!(args.provider, Provider::Digitalocean);
        let args = parse_init_args(&["test", "--provider", "digitalocean"]);
        assert_eq!(args.provider, Provider::Digitalocean);
    }
}
