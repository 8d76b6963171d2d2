//! Local process target (`berth run`).

use std::path::{Path, PathBuf};

use crate::core::error::{BerthError, BerthResult};
use crate::core::resource::Resource;
use crate::util::process::{shell_quote, ProcessBuilder};
use crate::wiring::{Resolver, Target, Wiring};

/// A resource's bring-up command with its wiring as environment assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalInvocation {
    pub resource: String,
    pub cwd: PathBuf,
    pub env: Wiring,
    pub command: String,
}

impl LocalInvocation {
    /// The invocation as one shell line: `K=V ... command`.
    pub fn shell_line(&self) -> String {
        let mut parts: Vec<String> = self
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, shell_quote(v)))
            .collect();
        parts.push(self.command.clone());
        parts.join(" ")
    }

    /// A process running the shell line with `sh -c` in the resource directory.
    pub fn to_process(&self) -> ProcessBuilder {
        ProcessBuilder::new("sh")
            .arg("-c")
            .arg(self.shell_line())
            .cwd(&self.cwd)
    }
}

/// Compile the local invocation for `resource`.
///
/// The process runs in `{root}/{name}`; databases are rejected.
pub fn compile(resolver: &Resolver<'_>, resource: &Resource, root: &Path) -> BerthResult<LocalInvocation> {
    if resource.is_database() {
        return Err(BerthError::NotRunnable {
            name: resource.name.clone(),
        });
    }
    let command = resource
        .expanded_command()
        .ok_or_else(|| BerthError::MissingOption {
            entity: "resource",
            name: resource.name.clone(),
            option: "command",
        })?;
    let env = resolver.resolve_resource(resource, Target::Run)?;

    let invocation = LocalInvocation {
        resource: resource.name.clone(),
        cwd: root.join(&resource.name),
        env,
        command,
    };
    tracing::debug!("local invocation: {}", invocation.shell_line());
    Ok(invocation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::test_support::{full_project, scenario_project};
    use crate::wiring::SecretStore;

    #[test]
    fn test_shell_line() {
        let project = scenario_project();
        let secrets = SecretStore::none();
        let resolver = Resolver::new(&project, &secrets);

        let inv = compile(&resolver, &project.resources["svc"], Path::new("/work")).unwrap();
        assert_eq!(
            inv.shell_line(),
            "storeHOST=127.0.0.1:5432 authHOST=127.0.0.1:9000 npm start"
        );
        assert_eq!(inv.cwd, PathBuf::from("/work/svc"));

        let process = inv.to_process();
        assert_eq!(process.get_program(), Path::new("sh"));
        assert_eq!(process.get_args()[0], "-c");
    }

    #[test]
    fn test_placeholders_and_peers() {
        let project = full_project();
        let secrets = SecretStore::none();
        let resolver = Resolver::new(&project, &secrets);

        let inv = compile(&resolver, &project.resources["web"], Path::new("/work")).unwrap();
        assert!(inv.shell_line().ends_with("npm run dev -- --port 3000"));
        assert_eq!(inv.env.get("svcHOST"), Some("127.0.0.1:8080"));
    }

    #[test]
    fn test_database_rejected() {
        let project = scenario_project();
        let secrets = SecretStore::none();
        let resolver = Resolver::new(&project, &secrets);

        let err = compile(&resolver, &project.resources["store"], Path::new("/work")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    }

    #[test]
    fn test_missing_command() {
        let mut project = scenario_project();
        project.resources.get_mut("svc").unwrap().command = None;
        let secrets = SecretStore::none();
        let resolver = Resolver::new(&project, &secrets);

        let err = compile(&resolver, &project.resources["svc"], Path::new("/work")).unwrap_err();
        assert!(matches!(err, BerthError::MissingOption { option: "command", .. }));
    }
}
