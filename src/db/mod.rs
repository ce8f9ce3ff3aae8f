//! Database access layer.
//!
//! This module provides:
//! - The per-invocation connection and its session setup
//! - Case table introspection
//! - Statement building for the two page shapes
//! - Page execution and row-to-text conversion

pub mod connection;
pub mod executor;
pub mod schema;
pub mod statement;
pub mod types;

pub use connection::CaseConnection;
pub use executor::QueryExecutor;
pub use schema::{CaseColumn, CaseTable, SchemaInspector};
pub use statement::{Statement, build_statement};
