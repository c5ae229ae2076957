//! Error types for mcp-stdio-server.
//!
//! Three families live here:
//!
//! - [`ConfigError`]: failures while loading the configuration file at startup.
//! - [`RegistryError`]: duplicate keys while building the capability registry.
//! - [`McpError`]: failures while handling a single JSON-RPC request. Every
//!   variant maps to a stable JSON-RPC error code and is converted into the
//!   `error` member of the response envelope; none of them ever reaches the
//!   transport loop.

use std::path::PathBuf;

use serde_json::{json, Value};
use thiserror::Error;

use crate::mcp::protocol::{ErrorCode, JsonRpcErrorData};

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised while building the capability registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A key was registered twice within the same family.
    #[error("duplicate {family} registration: {key}")]
    Duplicate {
        /// Capability family ("tool", "resource" or "prompt").
        family: &'static str,
        /// The clashing name or uri.
        key: String,
    },
}

/// Business-rule violations raised by a tool, distinct from malformed input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainFailure {
    /// Division with a zero divisor.
    #[error("Division by zero")]
    DivisionByZero,

    /// Any other tool-specific rule violation.
    #[error("{0}")]
    Other(String),
}

impl DomainFailure {
    /// Short machine-readable kind, reported in the error `data`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DivisionByZero => "DivisionByZero",
            Self::Other(_) => "DomainFailure",
        }
    }
}

/// Failures produced while dispatching one request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum McpError {
    /// A gated method was called before `initialize`.
    #[error("Server not initialised")]
    NotInitialized,

    /// The method name is not one the server understands.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Params are missing, of the wrong shape, or hold invalid values.
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// `tools/call` named a tool that is not registered.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// `resources/read` named a uri that is not registered.
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    /// `prompts/get` named a prompt that is not registered.
    #[error("Unknown prompt: {0}")]
    UnknownPrompt(String),

    /// A handler-specific business rule was violated.
    #[error(transparent)]
    Domain(#[from] DomainFailure),

    /// Anything unanticipated, including handler panics.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Builds an invalid-params error from a serde decode failure.
    #[must_use]
    pub fn invalid_params(context: &str, source: &serde_json::Error) -> Self {
        Self::InvalidParams(format!("{context}: {source}"))
    }

    /// Returns the JSON-RPC error code for this failure.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::InvalidRequest,
            Self::MethodNotFound(_) => ErrorCode::MethodNotFound,
            Self::InvalidParams(_)
            | Self::UnknownTool(_)
            | Self::UnknownResource(_)
            | Self::UnknownPrompt(_) => ErrorCode::InvalidParams,
            Self::Domain(_) => ErrorCode::ServerError(-32000),
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Structured detail for the error `data` member, if any.
    fn data(&self) -> Option<Value> {
        match self {
            Self::NotInitialized => Some(json!({ "kind": "NotInitialized" })),
            Self::UnknownTool(name) => Some(json!({ "kind": "UnknownTool", "name": name })),
            Self::UnknownResource(uri) => Some(json!({ "kind": "UnknownResource", "uri": uri })),
            Self::UnknownPrompt(name) => Some(json!({ "kind": "UnknownPrompt", "name": name })),
            Self::Domain(failure) => Some(json!({ "kind": failure.kind() })),
            Self::MethodNotFound(_) | Self::InvalidParams(_) | Self::Internal(_) => None,
        }
    }
}

impl From<McpError> for JsonRpcErrorData {
    fn from(err: McpError) -> Self {
        let data = err.data();
        let error = Self::with_message(err.error_code(), err.to_string());
        match data {
            Some(data) => error.with_data(data),
            None => error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn validation_error_display() {
        let error = ConfigError::ValidationError {
            message: "invalid setting".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("invalid setting"));
    }

    #[test]
    fn registry_error_display() {
        let error = RegistryError::Duplicate {
            family: "tool",
            key: "echo".to_string(),
        };
        assert_eq!(error.to_string(), "duplicate tool registration: echo");
    }

    #[test]
    fn codes_follow_json_rpc() {
        assert_eq!(McpError::MethodNotFound("x".into()).error_code().code(), -32601);
        assert_eq!(McpError::InvalidParams("x".into()).error_code().code(), -32602);
        assert_eq!(McpError::Internal("x".into()).error_code().code(), -32603);
        assert_eq!(McpError::NotInitialized.error_code().code(), -32600);
        assert_eq!(
            McpError::from(DomainFailure::DivisionByZero).error_code().code(),
            -32000
        );
    }

    #[test]
    fn unknown_lookup_carries_name_in_data() {
        let data = JsonRpcErrorData::from(McpError::UnknownResource("x://nope".into()));
        assert_eq!(data.code, -32602);
        assert_eq!(data.message, "Unknown resource: x://nope");
        let detail = data.data.unwrap();
        assert_eq!(detail["kind"], "UnknownResource");
        assert_eq!(detail["uri"], "x://nope");
    }

    #[test]
    fn domain_failure_is_transparent() {
        let err = McpError::from(DomainFailure::DivisionByZero);
        assert_eq!(err.to_string(), "Division by zero");
        let data = JsonRpcErrorData::from(err);
        assert_eq!(data.data.unwrap()["kind"], "DivisionByZero");
    }

    #[test]
    fn invalid_params_has_no_data() {
        let data = JsonRpcErrorData::from(McpError::InvalidParams("missing field".into()));
        assert!(data.data.is_none());
    }
}
