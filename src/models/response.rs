//! Response returned to the invocation runtime.

use crate::models::query::CaseRows;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use std::collections::BTreeMap;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// `{statusCode, headers, body}` triple understood by API gateways.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LambdaResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl LambdaResponse {
    /// Response with a JSON content type and the given body.
    pub fn json(status_code: u16, body: String) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());
        Self {
            status_code,
            headers,
            body,
        }
    }

    /// 200 with the page serialized as an array of row objects.
    pub fn ok(rows: &CaseRows) -> Self {
        Self::json(200, rows.to_json_string())
    }

    /// 400 echoing the raw, unvalidated `page` and `size` values.
    pub fn bad_request(page: Option<&JsonValue>, size: Option<&JsonValue>) -> Self {
        let body = json!({
            "Page": page.cloned().unwrap_or(JsonValue::Null),
            "Size": size.cloned().unwrap_or(JsonValue::Null),
        });
        Self::json(400, body.to_string())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("Content-Type").map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_echoes_raw_values() {
        let page = json!("-1");
        let size = json!("abc");
        let response = LambdaResponse::bad_request(Some(&page), Some(&size));
        assert_eq!(response.status_code, 400);
        assert_eq!(response.content_type(), Some(JSON_CONTENT_TYPE));
        assert_eq!(response.body, r#"{"Page":"-1","Size":"abc"}"#);
    }

    #[test]
    fn test_bad_request_with_missing_values() {
        let response = LambdaResponse::bad_request(None, Some(&json!(10)));
        assert_eq!(response.body, r#"{"Page":null,"Size":10}"#);
    }

    #[test]
    fn test_ok_serializes_rows() {
        let response = LambdaResponse::ok(&CaseRows::default());
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, "[]");
    }

    #[test]
    fn test_serialized_shape() {
        let response = LambdaResponse::json(200, "[]".to_string());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "statusCode": 200,
                "headers": {"Content-Type": "application/json"},
                "body": "[]"
            })
        );
    }
}
