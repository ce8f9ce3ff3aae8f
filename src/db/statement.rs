//! SQL for the two page shapes.
//!
//! Only identifiers are interpolated, and always quoted. Every value,
//! including LIMIT and OFFSET, travels as a bound parameter.

use crate::db::schema::CaseTable;
use crate::models::{CaseQuery, DatabaseType, QueryParam};

/// A ready-to-bind statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<QueryParam>,
}

pub fn build_statement(query: &CaseQuery, db_type: DatabaseType, table: &CaseTable) -> Statement {
    let mut sql = format!(
        "SELECT {} FROM {}",
        table.select_list(db_type),
        table.qualified_name(db_type)
    );
    let mut params = Vec::with_capacity(4);

    let order_column = match query {
        CaseQuery::Latest { .. } => &table.id_column,
        CaseQuery::UpdatedBetween { range, .. } => {
            let modified = db_type.quote_identifier(&table.modified_column);
            sql.push_str(&format!(
                " WHERE {modified} >= {} AND {modified} <= {}",
                db_type.placeholder(1),
                db_type.placeholder(2)
            ));
            params.push(QueryParam::Timestamp(range.from));
            params.push(QueryParam::Timestamp(range.to));
            &table.modified_column
        }
    };

    let next = params.len();
    sql.push_str(&format!(
        " ORDER BY {} DESC LIMIT {} OFFSET {}",
        table.qualified_column(db_type, order_column),
        db_type.placeholder(next + 1),
        db_type.placeholder(next + 2)
    ));
    params.push(QueryParam::Int(query.limit()));
    params.push(QueryParam::Int(query.offset()));

    Statement { sql, params }
}
