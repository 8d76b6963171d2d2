//! Error types shared by every berth operation.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Broad classification of a [`BerthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    IntegrityViolation,
    UnsupportedOperation,
    ExternalFailure,
    Configuration,
    Io,
}

/// Error raised by the berth library.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum BerthError {
    #[error("{entity} `{name}` not found")]
    #[diagnostic(code(berth::not_found))]
    NotFound { entity: &'static str, name: String },

    #[error("{message}")]
    #[diagnostic(code(berth::conflict))]
    Conflict { message: String },

    #[error("manifest integrity violation: {message}")]
    #[diagnostic(
        code(berth::integrity),
        help("Fix Berth.toml by hand; berth never repairs dangling references on its own")
    )]
    IntegrityViolation { message: String },

    #[error("`{operation}` is not supported by provider `{provider}`")]
    #[diagnostic(code(berth::unsupported))]
    UnsupportedOperation {
        provider: String,
        operation: &'static str,
    },

    #[error("database `{name}` cannot run as a local process")]
    #[diagnostic(
        code(berth::not_runnable),
        help("Databases run in containers; use `berth test` instead")
    )]
    NotRunnable { name: String },

    #[error("`{command}` failed with exit code {status:?}\n{output}")]
    #[diagnostic(code(berth::external))]
    ExternalFailure {
        command: String,
        status: Option<i32>,
        output: String,
    },

    #[error("no main cluster is designated for provider `{provider}`")]
    #[diagnostic(
        code(berth::no_main_cluster),
        help("Run `berth cluster provision <name>` or `berth cluster use <name>`")
    )]
    MissingMainCluster { provider: String },

    #[error("{entity} `{name}` requires option `{option}`")]
    #[diagnostic(code(berth::missing_option))]
    MissingOption {
        entity: &'static str,
        name: String,
        option: &'static str,
    },

    #[error("invalid name `{name}`: {reason}")]
    #[diagnostic(code(berth::invalid_name))]
    InvalidName { name: String, reason: &'static str },

    #[error("invalid manifest {path}: {message}")]
    #[diagnostic(code(berth::invalid_manifest))]
    InvalidManifest { path: PathBuf, message: String },

    #[error("could not find `Berth.toml` in `{0}` or any parent directory")]
    #[diagnostic(code(berth::no_manifest), help("Run `berth init` to create a project"))]
    ManifestNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    #[diagnostic(code(berth::config))]
    Config(String),

    #[error("failed to access {path}")]
    #[diagnostic(code(berth::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML")]
    #[diagnostic(code(berth::toml))]
    TomlParse(#[from] toml::de::Error),

    #[error("failed to serialize TOML")]
    #[diagnostic(code(berth::toml))]
    TomlWrite(#[from] toml::ser::Error),

    #[error("failed to serialize compose document")]
    #[diagnostic(code(berth::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

/// Result alias used across the library.
pub type BerthResult<T> = std::result::Result<T, BerthError>;

impl BerthError {
    pub fn not_found(entity: &'static str, name: impl Into<String>) -> Self {
        BerthError::NotFound {
            entity,
            name: name.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        BerthError::Conflict {
            message: message.into(),
        }
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        BerthError::IntegrityViolation {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BerthError::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BerthError::NotFound { .. } | BerthError::ManifestNotFound(_) => ErrorKind::NotFound,
            BerthError::Conflict { .. } => ErrorKind::Conflict,
            BerthError::IntegrityViolation { .. } => ErrorKind::IntegrityViolation,
            BerthError::UnsupportedOperation { .. } | BerthError::NotRunnable { .. } => {
                ErrorKind::UnsupportedOperation
            }
            BerthError::ExternalFailure { .. } => ErrorKind::ExternalFailure,
            BerthError::MissingMainCluster { .. }
            | BerthError::MissingOption { .. }
            | BerthError::InvalidName { .. }
            | BerthError::InvalidManifest { .. }
            | BerthError::Config(_)
            | BerthError::TomlParse(_)
            | BerthError::TomlWrite(_)
            | BerthError::Yaml(_) => ErrorKind::Configuration,
            BerthError::Io { .. } => ErrorKind::Io,
        }
    }

    /// Convert to a user-facing diagnostic with suggested fixes.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            BerthError::NotFound { entity, .. } => match *entity {
                "resource" => diag.with_suggestion(suggestions::LIST_RESOURCES),
                "addon" => diag.with_suggestion(suggestions::LIST_ADDONS),
                "cluster" => diag.with_suggestion(suggestions::LIST_CLUSTERS),
                _ => diag,
            },
            BerthError::ManifestNotFound(_) => diag.with_suggestion(suggestions::NO_MANIFEST),
            BerthError::MissingMainCluster { .. } => {
                diag.with_suggestion(suggestions::NO_MAIN_CLUSTER)
            }
            BerthError::MissingOption { name, option, .. } if *option == "command" => diag
                .with_suggestion(format!(
                    "Add `command = \"...\"` under `[resources.{}]` in Berth.toml",
                    name
                )),
            BerthError::MissingOption { name, option, .. } => diag.with_suggestion(format!(
                "Add `{} = \"...\"` under `[resources.{}.options]` in Berth.toml",
                option, name
            )),
            BerthError::IntegrityViolation { .. } => {
                diag.with_context("the manifest was not modified")
            }
            _ => diag,
        }
    }
}
