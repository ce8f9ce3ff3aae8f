//! Query-related data models.
//!
//! This module defines the two supported page shapes and the materialized
//! result they produce.

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

/// Primary key column, used for the default ordering.
pub const ID_COLUMN: &str = "id";

/// Modification timestamp column, used for date filtering.
pub const MODIFIED_COLUMN: &str = "lastmodifieddate";

/// Text written for SQL NULL cells.
pub const NULL_TEXT: &str = "None";

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParam {
    Int(i64),
    Timestamp(NaiveDateTime),
}

impl QueryParam {
    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Timestamp(_) => "timestamp",
        }
    }
}

/// Inclusive modification-time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

/// Validated request for one page of cases.
///
/// `offset` is a raw row offset taken straight from the `page` parameter;
/// it is never multiplied by `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: i64,
    pub limit: i64,
    pub updated_between: Option<DateRange>,
}

/// The only two query shapes the handler issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseQuery {
    /// All cases, newest id first.
    Latest { offset: i64, limit: i64 },
    /// Cases modified inside `range` (both ends inclusive), most recently
    /// modified first.
    UpdatedBetween {
        range: DateRange,
        offset: i64,
        limit: i64,
    },
}

impl CaseQuery {
    pub fn from_request(request: &PageRequest) -> Self {
        match request.updated_between {
            Some(range) => Self::UpdatedBetween {
                range,
                offset: request.offset,
                limit: request.limit,
            },
            None => Self::Latest {
                offset: request.offset,
                limit: request.limit,
            },
        }
    }

    pub fn offset(&self) -> i64 {
        match self {
            Self::Latest { offset, .. } | Self::UpdatedBetween { offset, .. } => *offset,
        }
    }

    pub fn limit(&self) -> i64 {
        match self {
            Self::Latest { limit, .. } | Self::UpdatedBetween { limit, .. } => *limit,
        }
    }
}

/// One case row with every cell rendered as text, in column order.
pub type CaseRecord = serde_json::Map<String, JsonValue>;

/// Materialized page of cases.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseRows {
    pub rows: Vec<CaseRecord>,
    pub execution_time_ms: u64,
}

impl CaseRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// JSON array of row objects.
    pub fn to_json_string(&self) -> String {
        JsonValue::Array(self.rows.iter().cloned().map(JsonValue::Object).collect()).to_string()
    }
}
