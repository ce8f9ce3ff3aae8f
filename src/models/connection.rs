//! Connection-related data models.
//!
//! The deployment environment decides everything about how we reach the
//! database: which driver, whether a port is part of the URL, and whether
//! the table lives in a named schema. That mapping is a closed table on
//! [`Environment::profile`].

use crate::error::{HandlerError, HandlerResult};
use std::str::FromStr;
use url::Url;

/// Fixed connection establishment timeout.
pub const CONNECT_TIMEOUT_SECS: u64 = 350;

/// Table holding the case records.
pub const CASE_TABLE: &str = "cssp_case";

/// Supported database types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseType {
    /// Includes MariaDB
    MySql,
    Postgres,
}

impl DatabaseType {
    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::Postgres => "PostgreSQL",
        }
    }

    /// URL scheme understood by the sqlx driver.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
        }
    }

    /// Session statement that drops the isolation level to READ UNCOMMITTED.
    ///
    /// Dirty reads are accepted here: the handler only ever reads, and
    /// throughput matters more than a consistent snapshot for this report.
    /// PostgreSQL silently treats the level as READ COMMITTED.
    pub fn isolation_statement(&self) -> &'static str {
        match self {
            Self::MySql => "SET SESSION TRANSACTION ISOLATION LEVEL READ UNCOMMITTED",
            Self::Postgres => {
                "SET SESSION CHARACTERISTICS AS TRANSACTION ISOLATION LEVEL READ UNCOMMITTED"
            }
        }
    }

    /// Quote an identifier for this dialect.
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            Self::MySql => format!("`{}`", name.replace('`', "``")),
            Self::Postgres => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Bind placeholder for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::MySql => "?".to_string(),
            Self::Postgres => format!("${}", index),
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Deployment tier the handler runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Dev,
    Stg,
    Prod,
}

/// Per-environment connection rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentProfile {
    pub dialect: DatabaseType,
    /// `DB_SCHEMA` must be set and becomes the session search path.
    pub requires_schema: bool,
    /// `DB_PORT` is part of the connection URL.
    pub uses_port: bool,
}

impl Environment {
    pub const ALL: [Environment; 3] = [Self::Dev, Self::Stg, Self::Prod];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Stg => "stg",
            Self::Prod => "prod",
        }
    }

    pub fn profile(&self) -> EnvironmentProfile {
        match self {
            Self::Dev => EnvironmentProfile {
                dialect: DatabaseType::MySql,
                requires_schema: false,
                uses_port: false,
            },
            Self::Stg | Self::Prod => EnvironmentProfile {
                dialect: DatabaseType::Postgres,
                requires_schema: true,
                uses_port: true,
            },
        }
    }
}

impl FromStr for Environment {
    type Err = HandlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|env| env.as_str() == s)
            .ok_or_else(|| {
                HandlerError::configuration(
                    format!("Unsupported environment '{}'", s),
                    "Set DB_ENV to one of: dev, stg, prod",
                )
            })
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated database settings, resolved once at startup.
#[derive(Clone)]
pub struct DatabaseSettings {
    pub environment: Environment,
    pub host: String,
    /// Only present when the environment's profile uses a port.
    pub port: Option<u16>,
    pub database: String,
    pub user_name: String,
    /// Contains sensitive data - never log
    pub password: String,
    /// Only present when the environment's profile requires a schema.
    pub schema: Option<String>,
}

impl DatabaseSettings {
    pub fn dialect(&self) -> DatabaseType {
        self.environment.profile().dialect
    }

    /// Build the driver connection URL with credentials percent-encoded.
    pub fn connection_url(&self) -> HandlerResult<Url> {
        let profile = self.environment.profile();
        let invalid = |what: &str| {
            HandlerError::configuration(
                format!("Cannot use {} in a {} connection URL", what, profile.dialect),
                "Check DB_HOST, DB_PORT, DB_NAME and DB_USER_NAME",
            )
        };

        let mut url = Url::parse(&format!("{}://localhost", profile.dialect.scheme()))
            .map_err(|e| HandlerError::internal(format!("Invalid URL template: {}", e)))?;
        url.set_host(Some(&self.host))
            .map_err(|_| invalid("DB_HOST"))?;
        if profile.uses_port {
            url.set_port(self.port).map_err(|_| invalid("DB_PORT"))?;
        }
        url.set_username(&self.user_name)
            .map_err(|_| invalid("DB_USER_NAME"))?;
        url.set_password(Some(&self.password))
            .map_err(|_| invalid("DB_PASSWORD"))?;
        url.set_path(&self.database);
        Ok(url)
    }

    /// Get a display-safe version of the connection URL (password masked).
    pub fn masked_connection_url(&self) -> String {
        match self.connection_url() {
            Ok(mut url) => {
                let _ = url.set_password(Some("****"));
                url.to_string()
            }
            Err(_) => format!("{}://<invalid>", self.dialect().scheme()),
        }
    }
}

impl std::fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("environment", &self.environment)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user_name", &self.user_name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(environment: Environment) -> DatabaseSettings {
        DatabaseSettings {
            environment,
            host: "db.internal".to_string(),
            port: environment.profile().uses_port.then_some(5432),
            database: "cases".to_string(),
            user_name: "reporter".to_string(),
            password: "p@ss:w/rd".to_string(),
            schema: environment
                .profile()
                .requires_schema
                .then(|| "crm".to_string()),
        }
    }

    #[test]
    fn test_environment_from_str() {
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Dev);
        assert_eq!("stg".parse::<Environment>().unwrap(), Environment::Stg);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Prod);
    }

    #[test]
    fn test_environment_rejects_unknown_values() {
        for value in ["", "DEV", "qa", "production", " dev"] {
            let err = value.parse::<Environment>().unwrap_err();
            assert!(
                matches!(err, HandlerError::Configuration { .. }),
                "'{}' should be rejected",
                value
            );
        }
    }

    #[test]
    fn test_profiles() {
        let dev = Environment::Dev.profile();
        assert_eq!(dev.dialect, DatabaseType::MySql);
        assert!(!dev.requires_schema);
        assert!(!dev.uses_port);

        for env in [Environment::Stg, Environment::Prod] {
            let profile = env.profile();
            assert_eq!(profile.dialect, DatabaseType::Postgres);
            assert!(profile.requires_schema);
            assert!(profile.uses_port);
        }
    }

    #[test]
    fn test_dev_url_is_mysql_without_port() {
        let url = settings(Environment::Dev).connection_url().unwrap();
        assert_eq!(url.scheme(), "mysql");
        assert_eq!(url.host_str(), Some("db.internal"));
        assert_eq!(url.port(), None);
        assert_eq!(url.path(), "/cases");
    }

    #[test]
    fn test_prod_url_is_postgres_with_port() {
        let url = settings(Environment::Prod).connection_url().unwrap();
        assert_eq!(url.scheme(), "postgres");
        assert_eq!(url.port(), Some(5432));
        assert_eq!(url.username(), "reporter");
    }

    #[test]
    fn test_credentials_are_percent_encoded() {
        let url = settings(Environment::Stg).connection_url().unwrap();
        assert_eq!(url.password(), Some("p%40ss%3Aw%2Frd"));
    }

    #[test]
    fn test_masked_url_hides_password() {
        let masked = settings(Environment::Stg).masked_connection_url();
        assert!(masked.contains("****"));
        assert!(!masked.contains("p%40ss"));
    }

    #[test]
    fn test_debug_hides_password() {
        let debug = format!("{:?}", settings(Environment::Dev));
        assert!(!debug.contains("p@ss"));
        assert!(debug.contains("db.internal"));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(DatabaseType::MySql.quote_identifier("id"), "`id`");
        assert_eq!(DatabaseType::MySql.quote_identifier("a`b"), "`a``b`");
        assert_eq!(DatabaseType::Postgres.quote_identifier("id"), "\"id\"");
        assert_eq!(DatabaseType::Postgres.quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(DatabaseType::MySql.placeholder(3), "?");
        assert_eq!(DatabaseType::Postgres.placeholder(3), "$3");
    }
}
