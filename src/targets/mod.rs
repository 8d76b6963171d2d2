//! Target compilers: one per execution target.
//!
//! - [`local`]: a shell invocation for `berth run`
//! - [`compose`]: a docker-compose document for `berth test`
//! - [`chart`]: helm releases for `berth deploy` / `berth undeploy`

pub mod chart;
pub mod compose;
pub mod local;

pub use chart::{ChartCompiler, ChartRelease, Deployment, ReleaseRef};
pub use compose::{ComposeBuilder, ComposeDocument};
pub use local::LocalInvocation;
