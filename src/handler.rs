//! Invocation handler.
//!
//! One call serves one page: validate the query string, open a connection,
//! describe the case table, fetch the page and close the connection.
//! Rejected page/size values are answered with a 400 before any database
//! work. Everything else that goes wrong is returned as a `HandlerError`
//! for the binary to treat as fatal.

use crate::db::{CaseConnection, QueryExecutor, SchemaInspector, build_statement};
use crate::error::HandlerResult;
use crate::models::{
    CaseQuery, CaseRows, DatabaseSettings, LambdaResponse, QueryParameters, normalize_event,
};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

/// Handle one invocation event.
pub async fn handle(event: JsonValue, settings: &DatabaseSettings) -> HandlerResult<LambdaResponse> {
    let event = normalize_event(event)?;
    let params = QueryParameters::from_event(event)?;

    let Some(request) = params.to_page_request()? else {
        warn!(page = ?params.page, size = ?params.size, "Wrong parameter(s)");
        return Ok(LambdaResponse::bad_request(
            params.page.as_ref(),
            params.size.as_ref(),
        ));
    };

    let query = CaseQuery::from_request(&request);
    info!(
        offset = query.offset(),
        limit = query.limit(),
        filtered = matches!(query, CaseQuery::UpdatedBetween { .. }),
        "Serving page"
    );

    let rows = fetch_cases(&query, settings).await?;
    info!(rows = rows.len(), execution_time_ms = rows.execution_time_ms, "Page fetched");

    Ok(LambdaResponse::ok(&rows))
}

/// Run `query` on a fresh connection, closing it whether or not the
/// query succeeds.
pub async fn fetch_cases(query: &CaseQuery, settings: &DatabaseSettings) -> HandlerResult<CaseRows> {
    let mut conn = CaseConnection::open(settings).await?;
    let result = fetch_on(&mut conn, query, settings.schema.as_deref()).await;
    conn.close().await;
    result
}

async fn fetch_on(
    conn: &mut CaseConnection,
    query: &CaseQuery,
    schema: Option<&str>,
) -> HandlerResult<CaseRows> {
    let table = SchemaInspector::describe_case_table(conn, schema).await?;
    let statement = build_statement(query, conn.db_type(), &table);
    QueryExecutor::fetch_page(conn, &statement).await
}
