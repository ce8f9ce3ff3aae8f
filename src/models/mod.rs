//! Data models for the case pager.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod request;
pub mod response;

// Re-export commonly used types
pub use connection::{
    CASE_TABLE, CONNECT_TIMEOUT_SECS, DatabaseSettings, DatabaseType, Environment,
    EnvironmentProfile,
};
pub use query::{
    CaseQuery, CaseRecord, CaseRows, DateRange, ID_COLUMN, MODIFIED_COLUMN, NULL_TEXT,
    PageRequest, QueryParam,
};
pub use request::{QueryParameters, normalize_event};
pub use response::{JSON_CONTENT_TYPE, LambdaResponse};
