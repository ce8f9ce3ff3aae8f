//! Configuration handling for the case pager.
//!
//! Settings come from CLI arguments or, as deployed, from environment
//! variables. They are validated once at startup into `DatabaseSettings`
//! so a misconfigured function fails before serving any request.

use crate::error::{HandlerError, HandlerResult};
use crate::models::{DatabaseSettings, Environment};
use clap::Parser;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration for the case pager.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "case-pager",
    about = "Serverless handler serving date-filtered pages of support cases as JSON",
    version,
    author
)]
pub struct Config {
    /// Deployment environment: dev (MySQL), stg or prod (PostgreSQL)
    #[arg(long = "db-env", env = "DB_ENV")]
    pub db_env: Option<String>,

    /// Database host name
    #[arg(long = "db-host", env = "DB_HOST")]
    pub db_host: Option<String>,

    /// Database port (stg and prod only)
    #[arg(long = "db-port", env = "DB_PORT")]
    pub db_port: Option<u16>,

    /// Database name
    #[arg(long = "db-name", env = "DB_NAME")]
    pub db_name: Option<String>,

    /// Database user
    #[arg(long = "db-user-name", env = "DB_USER_NAME")]
    pub db_user_name: Option<String>,

    /// Database password
    #[arg(long = "db-password", env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// Schema placed on the search path (stg and prod only)
    #[arg(long = "db-schema", env = "DB_SCHEMA")]
    pub db_schema: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = DEFAULT_LOG_LEVEL, env = "CASE_PAGER_LOG_LEVEL")]
    pub log_level: String,

    /// Output logs in JSON format
    #[arg(long, env = "CASE_PAGER_JSON_LOGS")]
    pub json_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_env: None,
            db_host: None,
            db_port: None,
            db_name: None,
            db_user_name: None,
            db_password: None,
            db_schema: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            json_logs: false,
        }
    }
}

/// Value of a required setting; blank counts as missing.
fn required(value: &Option<String>, name: &str) -> HandlerResult<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(HandlerError::configuration(
            format!("{} is not set", name),
            format!("Set the {} environment variable", name),
        )),
    }
}

impl Config {
    /// Resolve and validate the database settings for the configured
    /// environment.
    pub fn database_settings(&self) -> HandlerResult<DatabaseSettings> {
        let environment: Environment = required(&self.db_env, "DB_ENV")?.parse()?;
        let profile = environment.profile();

        let port = if profile.uses_port {
            match self.db_port {
                Some(port) => Some(port),
                None => {
                    return Err(HandlerError::configuration(
                        format!("DB_PORT is not set for environment '{}'", environment),
                        "Set the DB_PORT environment variable",
                    ));
                }
            }
        } else {
            None
        };

        let schema = if profile.requires_schema {
            Some(required(&self.db_schema, "DB_SCHEMA")?)
        } else {
            None
        };

        // Credentials are used verbatim; only names are trimmed.
        let password = self.db_password.clone().ok_or_else(|| {
            HandlerError::configuration(
                "DB_PASSWORD is not set",
                "Set the DB_PASSWORD environment variable",
            )
        })?;

        Ok(DatabaseSettings {
            environment,
            host: required(&self.db_host, "DB_HOST")?,
            port,
            database: required(&self.db_name, "DB_NAME")?,
            user_name: required(&self.db_user_name, "DB_USER_NAME")?,
            password,
            schema,
        })
    }
}
