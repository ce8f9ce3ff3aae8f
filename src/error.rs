//! Error types for the case pager.
//!
//! Every variant here is operational: configuration, infrastructure or a
//! contract violation by the caller of the date parser. End-user input
//! problems never become a `HandlerError`; they are answered with a 400
//! response instead. The binary's `main` is the only place that turns a
//! `HandlerError` into process termination.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Configuration error: {message}")]
    Configuration { message: String, suggestion: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Schema error: {message} (object: {object})")]
    Schema { message: String, object: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Invalid update date=[{value}] passed")]
    InvalidDate { value: String },

    #[error("Invalid event: {message}")]
    InvalidEvent { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl HandlerError {
    /// Create a configuration error with a helpful suggestion.
    pub fn configuration(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            object: object.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    pub fn invalid_date(value: impl Into<String>) -> Self {
        Self::InvalidDate {
            value: value.into(),
        }
    }

    pub fn invalid_event(message: impl Into<String>) -> Self {
        Self::InvalidEvent {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Configuration { suggestion, .. } => Some(suggestion),
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }
}

/// Convert sqlx errors to HandlerError.
impl From<sqlx::Error> for HandlerError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => HandlerError::connection(
                msg.to_string(),
                "Check the DB_* environment variables",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                HandlerError::database(
                    db_err.message(),
                    code,
                    "Check that the case table and its columns exist",
                )
            }
            sqlx::Error::Io(io_err) => HandlerError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => HandlerError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => HandlerError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::TypeNotFound { type_name } => HandlerError::schema(
                format!("Type not found: {}", type_name),
                type_name.to_string(),
            ),
            sqlx::Error::ColumnNotFound(col) => {
                HandlerError::schema(format!("Column not found: {}", col), col.to_string())
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => HandlerError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                HandlerError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => {
                HandlerError::internal(format!("Decode error: {}", source))
            }
            _ => HandlerError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for handler operations.
pub type HandlerResult<T> = Result<T, HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HandlerError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = HandlerError::database(
            "relation does not exist",
            Some("42P01".to_string()),
            "Check the table",
        );
        assert_eq!(err.suggestion(), Some("Check the table"));
        assert_eq!(HandlerError::internal("x").suggestion(), None);
    }

    #[test]
    fn test_invalid_date_message_names_value() {
        let err = HandlerError::invalid_date("2023-13-45");
        assert_eq!(err.to_string(), "Invalid update date=[2023-13-45] passed");
    }

    #[test]
    fn test_configuration_error_includes_suggestion() {
        let err = HandlerError::configuration("DB_ENV is not set", "Set DB_ENV to dev, stg or prod");
        assert!(err.to_string().contains("DB_ENV"));
        assert_eq!(err.suggestion(), Some("Set DB_ENV to dev, stg or prod"));
    }

    #[test]
    fn test_timeout_display() {
        let err = HandlerError::timeout("database connect", 350);
        assert_eq!(err.to_string(), "Timeout: database connect exceeded 350s");
    }

    #[test]
    fn test_sqlx_column_not_found_maps_to_schema() {
        let err: HandlerError = sqlx::Error::ColumnNotFound("lastmodifieddate".to_string()).into();
        assert!(matches!(err, HandlerError::Schema { ref object, .. } if object == "lastmodifieddate"));
    }

    #[test]
    fn test_sqlx_unmapped_errors_are_internal() {
        let err: HandlerError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, HandlerError::Internal { .. }));
        assert!(err.to_string().contains("Unknown database error"));
    }

    #[test]
    fn test_sqlx_io_error_maps_to_connection() {
        let err: HandlerError = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ))
        .into();
        assert!(matches!(err, HandlerError::Connection { .. }));
    }
}
