//! Page execution.
//!
//! Database-specific fetching lives in the `mysql` and `postgres`
//! submodules; both materialize the full page and hand the rows to
//! `process_rows`, which renders every cell as text.

use crate::db::connection::CaseConnection;
use crate::db::statement::Statement;
use crate::db::types::RowToText;
use crate::error::HandlerResult;
use crate::models::{CaseRows, QueryParam};
use std::time::Instant;
use tracing::debug;

/// Runs page statements on an open connection.
pub struct QueryExecutor;

impl QueryExecutor {
    /// Execute `statement` and materialize every returned row.
    pub async fn fetch_page(
        conn: &mut CaseConnection,
        statement: &Statement,
    ) -> HandlerResult<CaseRows> {
        let start = Instant::now();

        debug!(
            sql = %statement.sql,
            params = ?statement.params.iter().map(QueryParam::type_name).collect::<Vec<_>>(),
            "Executing query"
        );

        match conn {
            CaseConnection::MySql(c) => {
                let rows = mysql::fetch_rows(c, statement).await?;
                process_rows(rows, start)
            }
            CaseConnection::Postgres(c) => {
                let rows = postgres::fetch_rows(c, statement).await?;
                process_rows(rows, start)
            }
        }
    }
}

/// Process rows from any database type into `CaseRows`.
fn process_rows<R: RowToText>(rows: Vec<R>, start: Instant) -> HandlerResult<CaseRows> {
    let records = rows
        .iter()
        .map(R::to_text_record)
        .collect::<HandlerResult<Vec<_>>>()?;
    let execution_time_ms = start.elapsed().as_millis() as u64;

    debug!(rows = records.len(), execution_time_ms, "Query completed");

    Ok(CaseRows {
        rows: records,
        execution_time_ms,
    })
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod mysql {
    use super::*;
    use sqlx::mysql::{MySqlArguments, MySqlConnection, MySqlRow};

    pub async fn fetch_rows(
        conn: &mut MySqlConnection,
        statement: &Statement,
    ) -> HandlerResult<Vec<MySqlRow>> {
        let mut query = sqlx::query(&statement.sql);
        for param in &statement.params {
            query = bind_param(query, param);
        }
        Ok(query.fetch_all(&mut *conn).await?)
    }

    fn bind_param<'q>(
        query: sqlx::query::Query<'q, sqlx::MySql, MySqlArguments>,
        param: &'q QueryParam,
    ) -> sqlx::query::Query<'q, sqlx::MySql, MySqlArguments> {
        match param {
            QueryParam::Int(v) => query.bind(*v),
            QueryParam::Timestamp(v) => query.bind(*v),
        }
    }
}

mod postgres {
    use super::*;
    use sqlx::postgres::{PgArguments, PgConnection, PgRow};

    pub async fn fetch_rows(
        conn: &mut PgConnection,
        statement: &Statement,
    ) -> HandlerResult<Vec<PgRow>> {
        let mut query = sqlx::query(&statement.sql);
        for param in &statement.params {
            query = bind_param(query, param);
        }
        Ok(query.fetch_all(&mut *conn).await?)
    }

    fn bind_param<'q>(
        query: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
        param: &'q QueryParam,
    ) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
        match param {
            QueryParam::Int(v) => query.bind(*v),
            QueryParam::Timestamp(v) => query.bind(*v),
        }
    }
}
