//! JSON-RPC 2.0 message types for MCP protocol.
//!
//! This module defines the envelope types used on the wire and the codec that
//! turns one input line into an [`IncomingMessage`].
//!
//! # Message Types
//!
//! - **Request**: A message expecting a response (has an `id` key)
//! - **Response**: A reply to a request (success or error)
//! - **Notification**: A one-way message (no `id` key, no response written)
//!
//! The `id` is opaque: a string, a number or `null`. It is echoed back
//! unmodified and never interpreted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::McpError;

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "mcp-stdio-server";

/// A JSON-RPC 2.0 request ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID, kept exactly as received.
    Number(serde_json::Number),
    /// String request ID.
    String(String),
    /// An explicit `null` ID, also used when the ID cannot be recovered.
    Null,
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// A JSON-RPC 2.0 request message.
///
/// Requests expect a response from the server.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be "2.0".
    pub jsonrpc: String,

    /// Request identifier, echoed in the response.
    pub id: RequestId,

    /// The method to invoke.
    pub method: String,

    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Validates that this is a well-formed JSON-RPC 2.0 request.
    ///
    /// Returns an error message if validation fails.
    #[must_use]
    pub fn validate(&self) -> Option<&'static str> {
        if self.jsonrpc != "2.0" {
            return Some("jsonrpc field must be \"2.0\"");
        }
        if self.method.is_empty() {
            return Some("method field cannot be empty");
        }
        None
    }
}

/// A JSON-RPC 2.0 notification message (incoming).
///
/// Notifications do not have an ID and do not expect a response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcNotification {
    /// Must be "2.0".
    pub jsonrpc: String,

    /// The notification method.
    pub method: String,

    /// Optional parameters for the notification.
    #[serde(default)]
    pub params: Option<Value>,
}

/// A successful JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this response corresponds to.
    pub id: RequestId,

    /// The result of the method call.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result,
        }
    }
}

/// Standard JSON-RPC 2.0 error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
    /// Server-defined error.
    ServerError(i32),
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ServerError(code) => code,
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::ServerError(_) => "Server error",
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorData {
    /// Creates a new error from an error code.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.default_message().to_string(),
            data: None,
        }
    }

    /// Creates a new error with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Adds additional data to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A JSON-RPC 2.0 error response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this error corresponds to (`null` if unknown).
    pub id: RequestId,

    /// The error details.
    pub error: JsonRpcErrorData,
}

impl JsonRpcError {
    /// Creates a new error response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // JsonRpcErrorData contains String
    pub fn new(id: RequestId, error: JsonRpcErrorData) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            error,
        }
    }

    /// Creates a parse error response (ID cannot be determined).
    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(
            RequestId::Null,
            JsonRpcErrorData::from_code(ErrorCode::ParseError),
        )
    }

    /// Creates an invalid request error response.
    #[must_use]
    pub fn invalid_request(id: RequestId, reason: &str) -> Self {
        Self::new(
            id,
            JsonRpcErrorData::with_message(
                ErrorCode::InvalidRequest,
                format!("Invalid Request: {reason}"),
            ),
        )
    }

    /// Creates an error response from a dispatch failure.
    #[must_use]
    pub fn from_mcp(id: RequestId, err: McpError) -> Self {
        Self::new(id, err.into())
    }
}

/// An incoming message that could be either a request or notification.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// A request expecting a response.
    Request(JsonRpcRequest),
    /// A notification (no response expected).
    Notification(JsonRpcNotification),
}

impl IncomingMessage {
    /// Returns the method name of this message.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Request(req) => &req.method,
            Self::Notification(notif) => &notif.method,
        }
    }

    /// Returns the parameters of this message.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Option::as_ref is not const
    pub fn params(&self) -> Option<&Value> {
        match self {
            Self::Request(req) => req.params.as_ref(),
            Self::Notification(notif) => notif.params.as_ref(),
        }
    }

    /// Returns the request ID if this is a request.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(req) => Some(&req.id),
            Self::Notification(_) => None,
        }
    }
}

/// Parses a JSON string into an incoming message.
///
/// Lines that are not JSON fail with a parse error and a `null` ID. Lines that
/// are JSON but not a valid envelope fail with an invalid request error that
/// echoes the ID whenever it can be recovered.
///
/// # Errors
///
/// Returns a `JsonRpcError` if the JSON is malformed or not a valid message.
pub fn parse_message(json: &str) -> Result<IncomingMessage, JsonRpcError> {
    let value: Value = serde_json::from_str(json).map_err(|_| JsonRpcError::parse_error())?;

    let Some(obj) = value.as_object() else {
        return Err(JsonRpcError::invalid_request(
            RequestId::Null,
            "message must be a JSON object",
        ));
    };

    let id = obj
        .get("id")
        .map(|raw| serde_json::from_value::<RequestId>(raw.clone()));

    // An ID of the wrong type cannot be echoed
    let echo_id = match &id {
        Some(Ok(id)) => id.clone(),
        _ => RequestId::Null,
    };

    match obj.get("jsonrpc").and_then(Value::as_str) {
        Some("2.0") => {}
        _ => {
            return Err(JsonRpcError::invalid_request(
                echo_id,
                "jsonrpc field must be \"2.0\"",
            ))
        }
    }

    if !obj.get("method").is_some_and(Value::is_string) {
        return Err(JsonRpcError::invalid_request(
            echo_id,
            "method field must be a string",
        ));
    }

    match id {
        Some(Err(_)) => Err(JsonRpcError::invalid_request(
            RequestId::Null,
            "id must be a string, a number or null",
        )),
        Some(Ok(_)) => {
            let request: JsonRpcRequest = serde_json::from_value(value)
                .map_err(|e| JsonRpcError::invalid_request(echo_id.clone(), &e.to_string()))?;

            if let Some(reason) = request.validate() {
                return Err(JsonRpcError::invalid_request(request.id, reason));
            }

            Ok(IncomingMessage::Request(request))
        }
        None => {
            let notification: JsonRpcNotification = serde_json::from_value(value)
                .map_err(|e| JsonRpcError::invalid_request(RequestId::Null, &e.to_string()))?;

            Ok(IncomingMessage::Notification(notification))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Request(req) = msg else {
            panic!("Expected Request, got Notification");
        };
        assert_eq!(req.id, RequestId::from(1));
        assert_eq!(req.method, "initialize");
    }

    #[test]
    fn parse_valid_notification() {
        let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Notification(notif) = msg else {
            panic!("Expected Notification, got Request");
        };
        assert_eq!(notif.method, "notifications/initialized");
    }

    #[test]
    fn parse_string_id() {
        let json = r#"{"jsonrpc": "2.0", "id": "abc-123", "method": "test"}"#;
        let msg = parse_message(json).unwrap();

        let IncomingMessage::Request(req) = msg else {
            panic!("Expected Request, got Notification");
        };
        assert_eq!(req.id, RequestId::from("abc-123"));
    }

    #[test]
    fn parse_null_id_is_request() {
        let json = r#"{"jsonrpc": "2.0", "id": null, "method": "tools/list"}"#;
        let msg = parse_message(json).unwrap();

        assert_eq!(msg.id(), Some(&RequestId::Null));
        assert_eq!(msg.method(), "tools/list");
    }

    #[test]
    fn parse_fractional_id_kept_verbatim() {
        let json = r#"{"jsonrpc": "2.0", "id": 1.5, "method": "x"}"#;
        let msg = parse_message(json).unwrap();

        let id = msg.id().unwrap();
        assert_eq!(serde_json::to_string(id).unwrap(), "1.5");
    }

    #[test]
    fn parse_invalid_json() {
        let json = "not valid json";
        let err = parse_message(json).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::ParseError.code());
        assert_eq!(err.id, RequestId::Null);
    }

    #[test]
    fn parse_missing_jsonrpc() {
        let json = r#"{"id": 1, "method": "test"}"#;
        let err = parse_message(json).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
        assert_eq!(err.id, RequestId::from(1));
    }

    #[test]
    fn parse_wrong_jsonrpc_version() {
        let json = r#"{"jsonrpc": "1.0", "id": 1, "method": "test"}"#;
        let err = parse_message(json).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn parse_non_object() {
        let err = parse_message("[1, 2, 3]").unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
        assert_eq!(err.id, RequestId::Null);
    }

    #[test]
    fn parse_missing_method_echoes_id() {
        let err = parse_message(r#"{"jsonrpc": "2.0", "id": "q"}"#).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
        assert_eq!(err.id, RequestId::from("q"));
    }

    #[test]
    fn parse_object_id_rejected() {
        let err = parse_message(r#"{"jsonrpc": "2.0", "id": {}, "method": "x"}"#).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
        assert_eq!(err.id, RequestId::Null);
    }

    #[test]
    fn serialise_success_response() {
        let response = JsonRpcResponse::success(RequestId::from(1), serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""result":{"ok":true}"#));
    }

    #[test]
    fn serialise_error_response() {
        let error = JsonRpcError::from_mcp(
            RequestId::from(1),
            McpError::MethodNotFound("unknown/method".to_string()),
        );
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""code":-32601"#));
        assert!(json.contains("unknown/method"));
    }

    #[test]
    fn serialise_parse_error_has_null_id() {
        let json = serde_json::to_string(&JsonRpcError::parse_error()).unwrap();
        assert_eq!(
            json,
            r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32700,"message":"Parse error"}}"#
        );
    }

    #[test]
    fn request_id_display() {
        assert_eq!(format!("{}", RequestId::from(42)), "42");
        assert_eq!(format!("{}", RequestId::from("abc")), "abc");
        assert_eq!(format!("{}", RequestId::Null), "null");
    }
}
