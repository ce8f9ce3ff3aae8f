//! Case table introspection.
//!
//! The page query lists its columns explicitly, in ordinal order, so the
//! table is described once per invocation before the page is fetched.
//! The description also confirms the two columns every query shape
//! depends on, and records each column's type so PostgreSQL columns
//! without a native decoder can be selected as text.

use crate::db::connection::CaseConnection;
use crate::db::types::needs_text_cast;
use crate::error::{HandlerError, HandlerResult};
use crate::models::{CASE_TABLE, DatabaseType, ID_COLUMN, MODIFIED_COLUMN};
use tracing::debug;

/// One catalog column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseColumn {
    pub name: String,
    /// `udt_name` on PostgreSQL (`numeric`, `_text`, ...), `DATA_TYPE` on MySQL.
    pub type_name: String,
}

impl CaseColumn {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Resolved layout of the case table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseTable {
    pub schema: Option<String>,
    pub name: String,
    /// Columns in ordinal order, as the catalog spells them.
    pub columns: Vec<CaseColumn>,
    pub id_column: String,
    pub modified_column: String,
}

impl CaseTable {
    /// Validate a catalog column listing.
    ///
    /// Column lookups ignore case, since MySQL catalogs keep the declared
    /// spelling while PostgreSQL folds unquoted names to lower case.
    pub fn from_columns(
        schema: Option<&str>,
        name: &str,
        columns: Vec<CaseColumn>,
    ) -> HandlerResult<Self> {
        if columns.is_empty() {
            return Err(HandlerError::schema("Table not found", name));
        }

        let find = |wanted: &str| -> HandlerResult<String> {
            columns
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(wanted))
                .map(|c| c.name.clone())
                .ok_or_else(|| {
                    HandlerError::schema(
                        format!("Required column '{}' is missing", wanted),
                        name,
                    )
                })
        };

        let id_column = find(ID_COLUMN)?;
        let modified_column = find(MODIFIED_COLUMN)?;

        Ok(Self {
            schema: schema.map(str::to_string),
            name: name.to_string(),
            columns,
            id_column,
            modified_column,
        })
    }

    /// Table reference for a FROM clause, schema-qualified when one is known.
    pub fn qualified_name(&self, db_type: DatabaseType) -> String {
        match &self.schema {
            Some(schema) => format!(
                "{}.{}",
                db_type.quote_identifier(schema),
                db_type.quote_identifier(&self.name)
            ),
            None => db_type.quote_identifier(&self.name),
        }
    }

    /// Table-qualified column reference. In ORDER BY this resolves to the
    /// stored column rather than a `::text` alias of the same name.
    pub fn qualified_column(&self, db_type: DatabaseType, column: &str) -> String {
        format!(
            "{}.{}",
            self.qualified_name(db_type),
            db_type.quote_identifier(column)
        )
    }

    /// Comma-separated, quoted column list in ordinal order. Columns that
    /// need server-side rendering keep their name through an alias.
    pub fn select_list(&self, db_type: DatabaseType) -> String {
        self.columns
            .iter()
            .map(|c| {
                let quoted = db_type.quote_identifier(&c.name);
                if needs_text_cast(&c.type_name, db_type) {
                    format!("{quoted}::text AS {quoted}")
                } else {
                    quoted
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Schema inspector for the case table.
pub struct SchemaInspector;

impl SchemaInspector {
    /// Describe the case table in `schema`, or in the connection's default
    /// schema/database when none is configured.
    pub async fn describe_case_table(
        conn: &mut CaseConnection,
        schema: Option<&str>,
    ) -> HandlerResult<CaseTable> {
        let columns = match conn {
            CaseConnection::MySql(c) => mysql::list_columns(c, CASE_TABLE, schema).await?,
            CaseConnection::Postgres(c) => postgres::list_columns(c, CASE_TABLE, schema).await?,
        };
        debug!(table = CASE_TABLE, columns = columns.len(), "Described table");
        CaseTable::from_columns(schema, CASE_TABLE, columns)
    }
}

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub mod postgres {
        pub const LIST_COLUMNS: &str = r#"
            SELECT column_name::text AS column_name, udt_name::text AS udt_name
            FROM information_schema.columns
            WHERE table_schema = COALESCE($1, current_schema())
            AND table_name = $2
            ORDER BY ordinal_position
            "#;
    }

    pub mod mysql {
        pub const LIST_COLUMNS: &str = r#"
            SELECT COLUMN_NAME, DATA_TYPE
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = COALESCE(?, DATABASE())
            AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
            "#;
    }
}

// =============================================================================
// PostgreSQL Implementation
// =============================================================================

mod postgres {
    use super::{CaseColumn, queries};
    use crate::error::HandlerResult;
    use sqlx::postgres::PgConnection;
    use sqlx::Row;

    pub async fn list_columns(
        conn: &mut PgConnection,
        table_name: &str,
        schema: Option<&str>,
    ) -> HandlerResult<Vec<CaseColumn>> {
        let rows = sqlx::query(queries::postgres::LIST_COLUMNS)
            .bind(schema)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;

        rows.iter()
            .map(|row| -> HandlerResult<CaseColumn> {
                Ok(CaseColumn::new(
                    row.try_get::<String, _>("column_name")?,
                    row.try_get::<String, _>("udt_name")?,
                ))
            })
            .collect()
    }
}

// =============================================================================
// MySQL Implementation
// =============================================================================

mod mysql {
    use super::{CaseColumn, queries};
    use crate::error::HandlerResult;
    use sqlx::mysql::{MySqlConnection, MySqlRow};
    use sqlx::Row;

    /// MySQL 8 reports information_schema names as VARBINARY under some
    /// collations, so fall back to the raw bytes.
    fn get_string(row: &MySqlRow, column: &str) -> String {
        row.try_get::<String, _>(column)
            .ok()
            .or_else(|| {
                row.try_get::<Vec<u8>, _>(column)
                    .ok()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
            })
            .unwrap_or_default()
    }

    pub async fn list_columns(
        conn: &mut MySqlConnection,
        table_name: &str,
        schema: Option<&str>,
    ) -> HandlerResult<Vec<CaseColumn>> {
        let rows = sqlx::query(queries::mysql::LIST_COLUMNS)
            .bind(schema)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;

        Ok(rows
            .iter()
            .map(|row| CaseColumn::new(get_string(row, "COLUMN_NAME"), get_string(row, "DATA_TYPE")))
            .filter(|column| !column.name.is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<CaseColumn> {
        names.iter().map(|name| CaseColumn::new(*name, "text")).collect()
    }

    #[test]
    fn test_from_columns_keeps_ordinal_order() {
        let table = CaseTable::from_columns(
            None,
            CASE_TABLE,
            columns(&["id", "subject", "lastmodifieddate", "status"]),
        )
        .unwrap();
        assert_eq!(table.columns, columns(&["id", "subject", "lastmodifieddate", "status"]));
        assert_eq!(table.id_column, "id");
        assert_eq!(table.modified_column, "lastmodifieddate");
    }

    #[test]
    fn test_from_columns_matches_case_insensitively() {
        let table =
            CaseTable::from_columns(None, CASE_TABLE, columns(&["Id", "LastModifiedDate"])).unwrap();
        assert_eq!(table.id_column, "Id");
        assert_eq!(table.modified_column, "LastModifiedDate");
    }

    #[test]
    fn test_missing_table() {
        let err = CaseTable::from_columns(None, CASE_TABLE, Vec::new()).unwrap_err();
        assert!(matches!(err, HandlerError::Schema { .. }));
        assert!(err.to_string().contains("Table not found"));
    }

    #[test]
    fn test_missing_required_column() {
        let err = CaseTable::from_columns(None, CASE_TABLE, columns(&["id", "subject"])).unwrap_err();
        assert!(err.to_string().contains("lastmodifieddate"));

        let err = CaseTable::from_columns(None, CASE_TABLE, columns(&["lastmodifieddate"]))
            .unwrap_err();
        assert!(err.to_string().contains("'id'"));
    }

    #[test]
    fn test_qualified_name() {
        let table =
            CaseTable::from_columns(Some("support"), CASE_TABLE, columns(&["id", "lastmodifieddate"]))
                .unwrap();
        assert_eq!(
            table.qualified_name(DatabaseType::Postgres),
            r#""support"."cssp_case""#
        );

        let table =
            CaseTable::from_columns(None, CASE_TABLE, columns(&["id", "lastmodifieddate"])).unwrap();
        assert_eq!(table.qualified_name(DatabaseType::MySql), "`cssp_case`");
    }

    #[test]
    fn test_select_list_casts_postgres_columns_without_native_decoder() {
        let table = CaseTable::from_columns(
            None,
            CASE_TABLE,
            vec![
                CaseColumn::new("id", "int4"),
                CaseColumn::new("amount", "numeric"),
                CaseColumn::new("duration", "interval"),
                CaseColumn::new("tags", "_text"),
                CaseColumn::new("lastmodifieddate", "timestamp"),
            ],
        )
        .unwrap();
        assert_eq!(
            table.select_list(DatabaseType::Postgres),
            r#""id", "amount"::text AS "amount", "duration"::text AS "duration", "tags"::text AS "tags", "lastmodifieddate""#
        );
    }

    #[test]
    fn test_qualified_column() {
        let table =
            CaseTable::from_columns(Some("support"), CASE_TABLE, columns(&["id", "lastmodifieddate"]))
                .unwrap();
        assert_eq!(
            table.qualified_column(DatabaseType::Postgres, "id"),
            r#""support"."cssp_case"."id""#
        );
    }

    #[test]
    fn test_select_list_leaves_mysql_columns_bare() {
        let table = CaseTable::from_columns(
            None,
            CASE_TABLE,
            vec![
                CaseColumn::new("id", "int"),
                CaseColumn::new("priority", "decimal"),
                CaseColumn::new("lastmodifieddate", "datetime"),
            ],
        )
        .unwrap();
        assert_eq!(
            table.select_list(DatabaseType::MySql),
            "`id`, `priority`, `lastmodifieddate`"
        );
    }

    #[test]
    fn test_select_list_quotes_each_column() {
        let table = CaseTable::from_columns(
            None,
            CASE_TABLE,
            columns(&["id", "order", "lastmodifieddate"]),
        )
        .unwrap();
        assert_eq!(
            table.select_list(DatabaseType::MySql),
            "`id`, `order`, `lastmodifieddate`"
        );
        assert_eq!(
            table.select_list(DatabaseType::Postgres),
            r#""id", "order", "lastmodifieddate""#
        );
    }
}
