//! Per-invocation database connection.
//!
//! Each invocation opens exactly one connection and closes it before
//! returning. A dropped connection also closes its socket, so an early
//! return or panic cannot leak the session.

use crate::error::{HandlerError, HandlerResult};
use crate::models::{CONNECT_TIMEOUT_SECS, DatabaseSettings, DatabaseType};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection, Executor};
use std::str::FromStr;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Database-specific connection (avoids AnyConnection limitations).
#[derive(Debug)]
pub enum CaseConnection {
    MySql(MySqlConnection),
    Postgres(PgConnection),
}

impl CaseConnection {
    /// Connect, then prepare the session: READ UNCOMMITTED isolation and,
    /// when the environment has a schema, the search path.
    pub async fn open(settings: &DatabaseSettings) -> HandlerResult<Self> {
        let connect_timeout = Duration::from_secs(CONNECT_TIMEOUT_SECS);

        info!(
            environment = %settings.environment,
            url = %settings.masked_connection_url(),
            "Creating connection"
        );

        let mut connection = match timeout(connect_timeout, Self::connect(settings)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(HandlerError::timeout(
                    "database connect",
                    connect_timeout.as_secs(),
                ));
            }
        };

        if let Err(e) = connection.prepare_session(settings.schema.as_deref()).await {
            connection.close().await;
            return Err(e);
        }

        info!(db_type = %connection.db_type(), "Connection is created");
        Ok(connection)
    }

    async fn connect(settings: &DatabaseSettings) -> HandlerResult<Self> {
        let url = settings.connection_url()?;
        let db_type = settings.dialect();

        match db_type {
            DatabaseType::MySql => {
                let options = MySqlConnectOptions::from_str(url.as_str())
                    .map_err(|e| {
                        HandlerError::connection(
                            format!("Invalid MySQL connection string: {}", e),
                            "Check DB_HOST, DB_NAME and the credentials",
                        )
                    })?
                    .charset("utf8mb4");
                let connection = options
                    .connect()
                    .await
                    .map_err(|e| connect_error(db_type, &e))?;
                Ok(Self::MySql(connection))
            }
            DatabaseType::Postgres => {
                let options = PgConnectOptions::from_str(url.as_str()).map_err(|e| {
                    HandlerError::connection(
                        format!("Invalid PostgreSQL connection string: {}", e),
                        "Check DB_HOST, DB_PORT, DB_NAME and the credentials",
                    )
                })?;
                let connection = options
                    .connect()
                    .await
                    .map_err(|e| connect_error(db_type, &e))?;
                Ok(Self::Postgres(connection))
            }
        }
    }

    async fn prepare_session(&mut self, schema: Option<&str>) -> HandlerResult<()> {
        let db_type = self.db_type();
        let isolation = db_type.isolation_statement();
        debug!(statement = isolation, "Setting session isolation");

        match self {
            Self::MySql(conn) => {
                Executor::execute(&mut *conn, isolation).await?;
            }
            Self::Postgres(conn) => {
                Executor::execute(&mut *conn, isolation).await?;
                if let Some(schema) = schema {
                    let search_path =
                        format!("SET search_path TO {}", db_type.quote_identifier(schema));
                    debug!(schema = %schema, "Setting search path");
                    Executor::execute(&mut *conn, search_path.as_str()).await?;
                }
            }
        }
        Ok(())
    }

    /// Get the database type for this connection.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            Self::MySql(_) => DatabaseType::MySql,
            Self::Postgres(_) => DatabaseType::Postgres,
        }
    }

    /// Close the connection, logging rather than failing on a broken socket.
    pub async fn close(self) {
        let result = match self {
            Self::MySql(conn) => conn.close().await,
            Self::Postgres(conn) => conn.close().await,
        };
        match result {
            Ok(()) => info!("Closed connection"),
            Err(e) => warn!(error = %e, "Connection closed uncleanly"),
        }
    }
}

fn connect_error(db_type: DatabaseType, error: &sqlx::Error) -> HandlerError {
    HandlerError::connection(
        format!("Failed to connect: {}", error),
        connection_suggestion(db_type, error),
    )
}

/// Generate a helpful suggestion for connection errors.
fn connection_suggestion(db_type: DatabaseType, error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return format!(
            "Check that the {} server is running and accessible",
            db_type
        );
    }

    if error_str.contains("authentication") || error_str.contains("password") {
        return "Verify DB_USER_NAME and DB_PASSWORD".to_string();
    }

    if error_str.contains("does not exist") || error_str.contains("unknown database") {
        return "Check that DB_NAME names an existing database".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration or try disabling it".to_string();
    }

    match db_type {
        DatabaseType::Postgres => "Verify DB_HOST and DB_PORT point at the PostgreSQL server".to_string(),
        DatabaseType::MySql => "Verify DB_HOST points at the MySQL server".to_string(),
    }
}
