//! Command implementations

pub mod addon;
pub mod cluster;
pub mod completions;
pub mod deploy;
pub mod env;
pub mod init;
pub mod resource;
pub mod run;
pub mod test;
pub mod tree;

use anyhow::Result;

use berth::cloud::{self, ClusterBackend};
use berth::core::{Provider, Workspace};
use berth::util::GlobalContext;

/// Load the workspace enclosing the current directory.
pub fn workspace() -> Result<Workspace> {
    let ctx = GlobalContext::new()?;
    Ok(Workspace::discover(&ctx)?)
}

/// Backend for `provider`, or for the configured default provider.
pub fn cluster_backend(ws: &Workspace, provider: Option<Provider>) -> Box<dyn ClusterBackend> {
    let provider = provider.unwrap_or_else(|| ws.config().provider());
    cloud::backend(provider, &ws.config().tools())
}
