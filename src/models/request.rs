//! Invocation event models.
//!
//! The hosting runtime delivers the event either as a JSON object or as a
//! string containing one. Query string values are usually strings, but a
//! direct invocation may send numbers, so raw values are kept as JSON and
//! echoed back untouched in a 400 body.

use crate::error::{HandlerError, HandlerResult};
use crate::models::query::{DateRange, PageRequest};
use crate::validation::{is_valid_date, parse_date, parse_non_negative};
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

/// `queryStringParameters` of an invocation event.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct QueryParameters {
    #[serde(default)]
    pub page: Option<JsonValue>,
    #[serde(default)]
    pub size: Option<JsonValue>,
    #[serde(default)]
    pub updatedate_from: Option<JsonValue>,
    #[serde(default)]
    pub updatedate_to: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct InvocationEvent {
    #[serde(rename = "queryStringParameters", default)]
    query_string_parameters: Option<QueryParameters>,
}

/// Accept an event object, or a string holding one.
pub fn normalize_event(event: JsonValue) -> HandlerResult<JsonValue> {
    match event {
        JsonValue::Object(_) => Ok(event),
        JsonValue::String(text) => match serde_json::from_str::<JsonValue>(&text) {
            Ok(parsed @ JsonValue::Object(_)) => Ok(parsed),
            Ok(_) => Err(HandlerError::invalid_event(
                "The event string does not hold a JSON object",
            )),
            Err(e) => Err(HandlerError::invalid_event(format!(
                "The event string is not valid JSON: {}",
                e
            ))),
        },
        _ => Err(HandlerError::invalid_event(
            "The event object is neither dictionary nor string",
        )),
    }
}

/// Render a raw query value as the text the validators see.
fn raw_text(value: Option<&JsonValue>) -> Option<String> {
    match value? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl QueryParameters {
    /// Extract the query parameters from a normalized event.
    ///
    /// A missing or null `queryStringParameters` yields empty parameters,
    /// which then fail page/size validation.
    pub fn from_event(event: JsonValue) -> HandlerResult<Self> {
        let event: InvocationEvent = serde_json::from_value(event).map_err(|e| {
            HandlerError::invalid_event(format!("Malformed queryStringParameters: {}", e))
        })?;
        Ok(event.query_string_parameters.unwrap_or_default())
    }

    /// Validated `(offset, limit)`, or `None` when either value is rejected.
    pub fn page_bounds(&self) -> Option<(i64, i64)> {
        let offset = parse_non_negative(&raw_text(self.page.as_ref())?)?;
        let limit = parse_non_negative(&raw_text(self.size.as_ref())?)?;
        Some((offset, limit))
    }

    /// Resolve the update-date window.
    ///
    /// Invalid bounds are logged and treated as absent. The window is only
    /// used when both bounds survive; a lone bound is ignored with a warning
    /// and the unfiltered page is served instead.
    pub fn date_range(&self) -> HandlerResult<Option<DateRange>> {
        let from = resolve_bound("from", self.updatedate_from.as_ref())?;
        let to = resolve_bound("to", self.updatedate_to.as_ref())?;

        match (from, to) {
            (Some(from), Some(to)) => Ok(Some(DateRange { from, to })),
            (None, None) => Ok(None),
            (from, to) => {
                warn!(
                    update_date_from = ?from,
                    update_date_to = ?to,
                    "Only one update date bound is usable; ignoring the date filter"
                );
                Ok(None)
            }
        }
    }

    /// Build the full page request, or `None` when page/size are rejected.
    pub fn to_page_request(&self) -> HandlerResult<Option<PageRequest>> {
        let Some((offset, limit)) = self.page_bounds() else {
            return Ok(None);
        };
        Ok(Some(PageRequest {
            offset,
            limit,
            updated_between: self.date_range()?,
        }))
    }
}

fn resolve_bound(name: &str, value: Option<&JsonValue>) -> HandlerResult<Option<NaiveDateTime>> {
    if value.is_none_or(JsonValue::is_null) {
        return Ok(None);
    }
    let text = raw_text(value);
    if !is_valid_date(text.as_deref()) {
        warn!(bound = name, value = ?value, "Update date is incorrect");
        return Ok(None);
    }
    let parsed = parse_date(text.as_deref().unwrap_or_default())?;
    info!(bound = name, update_date = %parsed, "Update date accepted");
    Ok(Some(parsed))
}
