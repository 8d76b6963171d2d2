//! Deployable resources (apis, frontends, databases).

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::error::{BerthError, BerthResult};

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9]{0,39}$").expect("name pattern is a valid regex")
});

static ENV_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("env key pattern is a valid regex")
});

/// Whether `key` is a valid environment variable name.
pub fn is_env_key(key: &str) -> bool {
    ENV_KEY_RE.is_match(key)
}

/// Check that a resource or addon name can be used as an env-var prefix,
/// compose service name, helm release name and DNS label at the same time.
pub fn validate_name(name: &str) -> BerthResult<()> {
    if name.is_empty() {
        return Err(BerthError::InvalidName {
            name: name.to_string(),
            reason: "names cannot be empty",
        });
    }
    if !NAME_RE.is_match(name) {
        return Err(BerthError::InvalidName {
            name: name.to_string(),
            reason: "use 1-40 lowercase letters and digits, starting with a letter",
        });
    }
    Ok(())
}

/// The kind of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Api,
    Frontend,
    Database,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Api => "api",
            ResourceKind::Frontend => "frontend",
            ResourceKind::Database => "database",
        }
    }

    pub fn is_database(&self) -> bool {
        matches!(self, ResourceKind::Database)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "api" => Ok(ResourceKind::Api),
            "frontend" | "web" => Ok(ResourceKind::Frontend),
            "database" | "db" => Ok(ResourceKind::Database),
            _ => Err(format!(
                "invalid resource kind '{}'; expected 'api', 'frontend', or 'database'",
                s
            )),
        }
    }
}

/// Database engines berth knows how to run in every target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseEngine {
    Postgres,
    Mysql,
    Mongodb,
}

impl DatabaseEngine {
    /// Parse a framework tag into an engine.
    pub fn from_framework(framework: &str) -> Option<Self> {
        match framework.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(DatabaseEngine::Postgres),
            "mysql" | "mariadb" => Some(DatabaseEngine::Mysql),
            "mongodb" | "mongo" => Some(DatabaseEngine::Mongodb),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseEngine::Postgres => "postgres",
            DatabaseEngine::Mysql => "mysql",
            DatabaseEngine::Mongodb => "mongodb",
        }
    }

    /// Container image used for the compose target.
    pub fn default_image(&self) -> &'static str {
        match self {
            DatabaseEngine::Postgres => "postgres:16",
            DatabaseEngine::Mysql => "mysql:8.4",
            DatabaseEngine::Mongodb => "mongo:7",
        }
    }

    /// Helm chart used for the cluster target.
    pub fn chart(&self) -> &'static str {
        match self {
            DatabaseEngine::Postgres => "bitnami/postgresql",
            DatabaseEngine::Mysql => "bitnami/mysql",
            DatabaseEngine::Mongodb => "bitnami/mongodb",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            DatabaseEngine::Postgres => 5432,
            DatabaseEngine::Mysql => 3306,
            DatabaseEngine::Mongodb => 27017,
        }
    }

    /// Container environment variable that sets the listening port. Mongo
    /// takes `--port` on its command line instead.
    pub fn port_env(&self) -> Option<&'static str> {
        match self {
            DatabaseEngine::Postgres => Some("PGPORT"),
            DatabaseEngine::Mysql => Some("MYSQL_TCP_PORT"),
            DatabaseEngine::Mongodb => None,
        }
    }

    /// Data directory inside the container.
    pub fn data_dir(&self) -> &'static str {
        match self {
            DatabaseEngine::Postgres => "/var/lib/postgresql/data",
            DatabaseEngine::Mysql => "/var/lib/mysql",
            DatabaseEngine::Mongodb => "/data/db",
        }
    }

    /// Container environment variables for (user, password, database).
    pub fn credential_env(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            DatabaseEngine::Postgres => ("POSTGRES_USER", "POSTGRES_PASSWORD", "POSTGRES_DB"),
            DatabaseEngine::Mysql => ("MYSQL_USER", "MYSQL_PASSWORD", "MYSQL_DATABASE"),
            DatabaseEngine::Mongodb => (
                "MONGO_INITDB_ROOT_USERNAME",
                "MONGO_INITDB_ROOT_PASSWORD",
                "MONGO_INITDB_DATABASE",
            ),
        }
    }

    /// In-cluster primary host for a release installed in its own namespace.
    pub fn cluster_host(&self, release: &str, port: u16) -> String {
        let service = match self {
            DatabaseEngine::Postgres => format!("{}-postgresql-primary", release),
            DatabaseEngine::Mysql => format!("{}-mysql-primary", release),
            DatabaseEngine::Mongodb => format!("{}-mongodb", release),
        };
        format!("{}.{}.svc.cluster.local:{}", service, release, port)
    }

    /// In-cluster read-replica host, for engines that have one.
    pub fn cluster_read_host(&self, release: &str, port: u16) -> Option<String> {
        let service = match self {
            DatabaseEngine::Postgres => format!("{}-postgresql-read", release),
            DatabaseEngine::Mysql => format!("{}-mysql-secondary", release),
            DatabaseEngine::Mongodb => return None,
        };
        Some(format!("{}.{}.svc.cluster.local:{}", service, release, port))
    }
}

impl FromStr for DatabaseEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DatabaseEngine::from_framework(s).ok_or_else(|| {
            format!(
                "invalid database engine '{}'; expected 'postgres', 'mysql', or 'mongodb'",
                s
            )
        })
    }
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addresses of an entity in each execution target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hosts {
    /// Loopback address used by `berth run`
    pub local: String,

    /// Service address on the compose network used by `berth test`
    pub test: String,

    /// Cluster-internal DNS name used by `berth deploy`
    pub cluster: String,

    /// Read-replica DNS name (databases with replicas only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_read: Option<String>,
}

impl Hosts {
    /// Default addresses for an app or addon living in the project namespace.
    pub fn for_service(name: &str, port: u16, project: &str) -> Self {
        Hosts {
            local: format!("127.0.0.1:{}", port),
            test: format!("{}:{}", name, port),
            cluster: format!("{}.{}.svc.cluster.local:{}", name, project, port),
            cluster_read: None,
        }
    }

    /// Default addresses for a database installed as its own release.
    pub fn for_database(name: &str, port: u16, engine: DatabaseEngine) -> Self {
        Hosts {
            local: format!("127.0.0.1:{}", port),
            test: format!("{}:{}", name, port),
            cluster: engine.cluster_host(name, port),
            cluster_read: engine.cluster_read_host(name, port),
        }
    }
}

/// Option keys understood by the target compilers.
pub mod options {
    pub const SIZE: &str = "size";
    pub const USER: &str = "user";
    pub const PASSWORD: &str = "password";
    pub const DATABASE: &str = "database";
    pub const REPLICAS: &str = "replicas";
    pub const HOST: &str = "host";
}

/// A deployable unit of the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource name (the key in `[resources]`)
    #[serde(skip)]
    pub name: String,

    pub kind: ResourceKind,

    pub port: u16,

    /// Framework tag (`express`, `react`, `postgres`, ...)
    pub framework: String,

    /// Container image reference
    pub image: String,

    /// Local bring-up command; `{port}` and `{name}` are substituted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Addons attached to this resource, in attach order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependents: Vec<String>,

    /// Free-form options (size, credentials, ingress host)
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub options: IndexMap<String, String>,

    /// Non-secret environment, appended after derived wiring
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub env: IndexMap<String, String>,

    pub hosts: Hosts,
}

impl Resource {
    /// Build a resource with default hosts for its kind.
    pub fn new(
        name: impl Into<String>,
        kind: ResourceKind,
        port: u16,
        framework: impl Into<String>,
        project: &str,
    ) -> BerthResult<Self> {
        let name = name.into();
        let framework = framework.into();
        validate_name(&name)?;

        let (image, hosts) = if kind.is_database() {
            let engine = DatabaseEngine::from_framework(&framework).ok_or_else(|| {
                BerthError::Config(format!(
                    "database `{}` uses unknown engine `{}` (expected postgres, mysql or mongodb)",
                    name, framework
                ))
            })?;
            (
                engine.default_image().to_string(),
                Hosts::for_database(&name, port, engine),
            )
        } else {
            (
                format!("{}-{}:latest", project, name),
                Hosts::for_service(&name, port, project),
            )
        };

        Ok(Resource {
            name,
            kind,
            port,
            framework,
            image,
            command: None,
            dependents: Vec::new(),
            options: IndexMap::new(),
            env: IndexMap::new(),
            hosts,
        })
    }

    pub fn is_database(&self) -> bool {
        self.kind.is_database()
    }

    /// The database engine, for database resources.
    pub fn engine(&self) -> Option<DatabaseEngine> {
        if self.is_database() {
            DatabaseEngine::from_framework(&self.framework)
        } else {
            None
        }
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// An option value, falling back to a default.
    pub fn option_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.option(key).unwrap_or(default)
    }

    /// Credential triple (user, password, database) for database resources.
    pub fn credentials(&self) -> (&str, &str, &str) {
        (
            self.option_or(options::USER, "berth"),
            self.option_or(options::PASSWORD, "berth"),
            self.option_or(options::DATABASE, &self.name),
        )
    }

    /// The bring-up command with placeholders expanded.
    pub fn expanded_command(&self) -> Option<String> {
        self.command.as_ref().map(|cmd| {
            cmd.replace("{port}", &self.port.to_string())
                .replace("{name}", &self.name)
        })
    }
}
