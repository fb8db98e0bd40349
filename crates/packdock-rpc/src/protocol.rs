//! JSON-RPC 2.0 types for the plugin channel.
//!
//! Each message is a single line of JSON (newline-delimited). Requests
//! come from the host driver; the adapter answers with exactly one
//! response per request, streaming `event` notifications in between for
//! the long-running verbs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use packdock_core::event::Event;

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const SERVER_ERROR: i64 = -32000;

/// A JSON-RPC 2.0 request. The id is kept as a raw value — hosts use
/// numbers or strings and get the same shape echoed back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// An out-of-band notification (no id, no response expected). Streamed
/// events ride on the `event` method with the envelope as params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn event(event: &Event) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: "event".into(),
            params: serde_json::to_value(event).ok(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: PARSE_ERROR,
            message: message.into(),
            data: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: INVALID_REQUEST,
            message: message.into(),
            data: None,
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: METHOD_NOT_FOUND,
            message: format!("method not found: {method}"),
            data: None,
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: INVALID_PARAMS,
            message: message.into(),
            data: None,
        }
    }

    /// Server-side failure. `data` carries the partial adapter state for
    /// apply/destroy so the host can persist it despite the error.
    pub fn server_error(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code: SERVER_ERROR,
            message: message.into(),
            data,
        }
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_accepts_string_and_number_ids() {
        let a: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc": "2.0", "id": 7, "method": "plan"}"#).unwrap();
        assert_eq!(a.id, Some(Value::from(7)));

        let b: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc": "2.0", "id": "abc", "method": "plan"}"#).unwrap();
        assert_eq!(b.id, Some(Value::from("abc")));
    }

    #[test]
    fn response_omits_the_absent_half() {
        let ok = JsonRpcResponse::success(Value::from(1), serde_json::json!({}));
        let line = serde_json::to_string(&ok).unwrap();
        assert!(!line.contains("\"error\""));

        let err = JsonRpcResponse::failure(Value::from(1), JsonRpcError::method_not_found("x"));
        let line = serde_json::to_string(&err).unwrap();
        assert!(!line.contains("\"result\""));
        assert!(line.contains("-32601"));
    }

    #[test]
    fn event_notification_wraps_the_envelope() {
        let n = JsonRpcNotification::event(&Event::progress("Creating memory: m (0%)"));
        let line = serde_json::to_string(&n).unwrap();
        assert!(line.contains("\"method\":\"event\""));
        assert!(line.contains("\"type\":\"progress\""));
    }
}
