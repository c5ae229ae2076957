//! Method dispatch and the per-method contracts.
//!
//! Incoming method names are resolved to the closed [`Method`] enumeration at
//! the boundary; anything else is `MethodNotFound`. Every method except
//! `initialize` and `initialized` is gated on the session, and the gate runs
//! before params are decoded. Params are decoded into per-method structs and
//! fail closed with `InvalidParams`.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::McpError;
use crate::mcp::capability::{ReadResourceResult, ResourceContents};
use crate::mcp::protocol::{
    IncomingMessage, JsonRpcError, JsonRpcResponse, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::registry::Registry;
use crate::mcp::session::{InitializeParams, Session};

/// The methods this server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `initialize`
    Initialize,
    /// `initialized`, also accepted as `notifications/initialized`.
    Initialized,
    /// `tools/list`
    ToolsList,
    /// `tools/call`
    ToolsCall,
    /// `resources/list`
    ResourcesList,
    /// `resources/read`
    ResourcesRead,
    /// `prompts/list`
    PromptsList,
    /// `prompts/get`
    PromptsGet,
}

impl Method {
    /// Every method, in documentation order.
    pub const ALL: [Self; 8] = [
        Self::Initialize,
        Self::Initialized,
        Self::ToolsList,
        Self::ToolsCall,
        Self::ResourcesList,
        Self::ResourcesRead,
        Self::PromptsList,
        Self::PromptsGet,
    ];

    /// Resolves a wire method name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "initialize" => Some(Self::Initialize),
            "initialized" | "notifications/initialized" => Some(Self::Initialized),
            "tools/list" => Some(Self::ToolsList),
            "tools/call" => Some(Self::ToolsCall),
            "resources/list" => Some(Self::ResourcesList),
            "resources/read" => Some(Self::ResourcesRead),
            "prompts/list" => Some(Self::PromptsList),
            "prompts/get" => Some(Self::PromptsGet),
            _ => None,
        }
    }

    /// Canonical wire name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Initialized => "initialized",
            Self::ToolsList => "tools/list",
            Self::ToolsCall => "tools/call",
            Self::ResourcesList => "resources/list",
            Self::ResourcesRead => "resources/read",
            Self::PromptsList => "prompts/list",
            Self::PromptsGet => "prompts/get",
        }
    }

    /// Whether the method needs a completed `initialize`.
    #[must_use]
    pub const fn requires_session(self) -> bool {
        !matches!(self, Self::Initialize | Self::Initialized)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ListCapabilities>,
    /// Resource-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ListCapabilities>,
    /// Prompt-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<ListCapabilities>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: Some(ListCapabilities::default()),
            resources: Some(ListCapabilities::default()),
            prompts: Some(ListCapabilities::default()),
        }
    }
}

/// Per-family capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListCapabilities {
    /// Whether the list can change during the session. The registry is
    /// fixed at startup, so this is never advertised.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool, so we must take &bool here
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for initialisation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Result of `initialize`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Always [`MCP_PROTOCOL_VERSION`].
    pub protocol_version: &'static str,
    /// Supported method families.
    pub capabilities: ServerCapabilities,
    /// Server identity.
    pub server_info: ServerInfo,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// Parameters for resources/read request.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadResourceParams {
    /// URI of the resource to read.
    pub uri: String,
}

/// Parameters for prompts/get request.
#[derive(Debug, Clone, Deserialize)]
pub struct GetPromptParams {
    /// Name of the prompt to render.
    pub name: String,
    /// Template arguments.
    #[serde(default)]
    pub arguments: Option<BTreeMap<String, String>>,
}

/// Routes requests to handlers, owning the session and the registry.
#[derive(Debug)]
pub struct Dispatcher {
    session: Session,
    registry: Registry,
    server_info: ServerInfo,
}

impl Dispatcher {
    /// Creates a dispatcher over a finished registry.
    #[must_use]
    pub fn new(registry: Registry, server_info: ServerInfo) -> Self {
        Self {
            session: Session::new(),
            registry,
            server_info,
        }
    }

    /// The current session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// The capability registry.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Handles one decoded message.
    ///
    /// Requests always yield exactly one response; notifications yield none.
    /// Panics inside a handler are caught here and reported as internal
    /// errors, so they never reach the transport loop.
    pub fn handle(
        &mut self,
        msg: &IncomingMessage,
    ) -> Option<Result<JsonRpcResponse, JsonRpcError>> {
        let method = msg.method();
        let params = msg.params();

        let outcome = catch_unwind(AssertUnwindSafe(|| self.dispatch(method, params)))
            .unwrap_or_else(|panic| {
                let message = panic_message(&*panic);
                tracing::error!(method, panic = %message, "Handler panicked");
                Err(McpError::Internal(message))
            });

        let Some(id) = msg.id() else {
            match outcome {
                Ok(_) => tracing::debug!(method, "Notification handled"),
                Err(e) => tracing::debug!(method, error = %e, "Notification failed"),
            }
            return None;
        };

        Some(match outcome {
            Ok(result) => Ok(JsonRpcResponse::success(id.clone(), result)),
            Err(e) => {
                tracing::debug!(method, id = %id, error = %e, "Request failed");
                Err(JsonRpcError::from_mcp(id.clone(), e))
            }
        })
    }

    /// Dispatches one method call.
    ///
    /// # Errors
    ///
    /// Returns `MethodNotFound` for unknown methods, `NotInitialized` for gated
    /// methods before `initialize`, and the method's own failures otherwise.
    pub fn dispatch(&mut self, method: &str, params: Option<&Value>) -> Result<Value, McpError> {
        let method =
            Method::from_name(method).ok_or_else(|| McpError::MethodNotFound(method.to_string()))?;

        if method.requires_session() {
            self.session.require_initialized()?;
        }

        match method {
            Method::Initialize => self.handle_initialize(params),
            Method::Initialized => Ok(json!({})),
            Method::ToolsList => Ok(json!({ "tools": self.registry.tools().collect::<Vec<_>>() })),
            Method::ToolsCall => self.handle_tools_call(decode_params(method, params)?),
            Method::ResourcesList => Ok(json!({
                "resources": self.registry.resources().collect::<Vec<_>>()
            })),
            Method::ResourcesRead => self.handle_resources_read(decode_params(method, params)?),
            Method::PromptsList => Ok(json!({
                "prompts": self.registry.prompts().collect::<Vec<_>>()
            })),
            Method::PromptsGet => self.handle_prompts_get(decode_params(method, params)?),
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(&mut self, params: Option<&Value>) -> Result<Value, McpError> {
        let params = params
            .and_then(|p| match serde_json::from_value::<InitializeParams>(p.clone()) {
                Ok(params) => Some(params),
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring unrecognised initialize params");
                    None
                }
            })
            .unwrap_or_default();

        if self.session.initialize(params) {
            tracing::info!(
                client = self.session.client_info().map(|c| c.name.as_str()),
                "Session initialised"
            );
        }

        if let Some(requested) = self.session.requested_version() {
            if requested != MCP_PROTOCOL_VERSION {
                tracing::warn!(
                    requested,
                    supported = MCP_PROTOCOL_VERSION,
                    "Client requested a different protocol version"
                );
            }
        }

        to_result(&InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION,
            capabilities: ServerCapabilities::default(),
            server_info: self.server_info.clone(),
        })
    }

    /// Handles the tools/call request.
    fn handle_tools_call(&self, params: ToolCallParams) -> Result<Value, McpError> {
        let tool = self
            .registry
            .tool(&params.name)
            .ok_or_else(|| McpError::UnknownTool(params.name.clone()))?;

        tracing::debug!(tool = %params.name, "Calling tool");
        let result = tool.call(Value::Object(params.arguments))?;
        to_result(&result)
    }

    /// Handles the resources/read request.
    fn handle_resources_read(&self, params: ReadResourceParams) -> Result<Value, McpError> {
        let resource = self
            .registry
            .resource(&params.uri)
            .ok_or_else(|| McpError::UnknownResource(params.uri.clone()))?;

        to_result(&ReadResourceResult {
            contents: vec![ResourceContents {
                mime_type: resource.mime_type().to_string(),
                text: resource.text.clone(),
                uri: params.uri,
            }],
        })
    }

    /// Handles the prompts/get request.
    fn handle_prompts_get(&self, params: GetPromptParams) -> Result<Value, McpError> {
        let prompt = self
            .registry
            .prompt(&params.name)
            .ok_or_else(|| McpError::UnknownPrompt(params.name.clone()))?;

        let result = prompt.render(params.arguments.unwrap_or_default())?;
        to_result(&result)
    }
}

/// Decodes the params of a method that requires them.
fn decode_params<T: DeserializeOwned>(method: Method, params: Option<&Value>) -> Result<T, McpError> {
    let params =
        params.ok_or_else(|| McpError::InvalidParams(format!("Missing {method} params")))?;

    serde_json::from_value(params.clone())
        .map_err(|e| McpError::invalid_params(&format!("Invalid {method} params"), &e))
}

fn to_result<T: Serialize>(result: &T) -> Result<Value, McpError> {
    serde_json::to_value(result).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialise result");
        McpError::Internal("failed to serialise result".to_string())
    })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::capability::{ToolCallResult, ToolDescriptor};
    use crate::mcp::protocol::{parse_message, RequestId};

    fn registry_with(name: &str, handler: fn(Value) -> Result<ToolCallResult, McpError>) -> Registry {
        Registry::builder()
            .tool(
                ToolDescriptor {
                    name: name.to_string(),
                    description: String::new(),
                    input_schema: json!({"type": "object"}),
                },
                handler,
            )
            .unwrap()
            .build()
    }

    fn ready(registry: Registry) -> Dispatcher {
        let mut dispatcher = Dispatcher::new(registry, ServerInfo::default());
        dispatcher.dispatch("initialize", None).unwrap();
        dispatcher
    }

    #[test]
    fn method_names_round_trip() {
        for method in Method::ALL {
            assert_eq!(Method::from_name(method.name()), Some(method));
        }
        assert_eq!(
            Method::from_name("notifications/initialized"),
            Some(Method::Initialized)
        );
        assert_eq!(Method::from_name("Tools/List"), None);
    }

    #[test]
    fn only_lifecycle_methods_are_ungated() {
        let ungated: Vec<_> = Method::ALL
            .into_iter()
            .filter(|m| !m.requires_session())
            .collect();
        assert_eq!(ungated, [Method::Initialize, Method::Initialized]);
    }

    #[test]
    fn gate_runs_before_params_decode() {
        let mut dispatcher = Dispatcher::new(Registry::default(), ServerInfo::default());
        let err = dispatcher
            .dispatch("tools/call", Some(&json!("garbage")))
            .unwrap_err();
        assert_eq!(err, McpError::NotInitialized);
    }

    #[test]
    fn initialize_tolerates_odd_params() {
        let mut dispatcher = Dispatcher::new(Registry::default(), ServerInfo::default());
        let result = dispatcher.dispatch("initialize", Some(&json!([1, 2]))).unwrap();
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert!(dispatcher.session().is_initialized());
    }

    #[test]
    fn initialize_records_client_version() {
        let mut dispatcher = Dispatcher::new(Registry::default(), ServerInfo::default());
        let result = dispatcher
            .dispatch(
                "initialize",
                Some(&json!({"protocolVersion": "2025-03-26", "capabilities": {"roots": {}}})),
            )
            .unwrap();

        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(dispatcher.session().requested_version(), Some("2025-03-26"));
    }

    #[test]
    fn initialize_advertises_all_families() {
        let mut dispatcher = Dispatcher::new(
            Registry::default(),
            ServerInfo {
                name: "demo".to_string(),
                version: "9.9.9".to_string(),
            },
        );
        let result = dispatcher.dispatch("initialize", Some(&json!({}))).unwrap();
        assert_eq!(result["serverInfo"], json!({"name": "demo", "version": "9.9.9"}));
        assert_eq!(
            result["capabilities"],
            json!({"tools": {}, "resources": {}, "prompts": {}})
        );
    }

    #[test]
    fn initialized_is_always_ok() {
        let mut dispatcher = Dispatcher::new(Registry::default(), ServerInfo::default());
        assert_eq!(dispatcher.dispatch("initialized", None).unwrap(), json!({}));
        assert!(!dispatcher.session().is_initialized());
    }

    #[test]
    fn missing_call_params_is_invalid() {
        let mut dispatcher = ready(Registry::default());
        let err = dispatcher.dispatch("tools/call", None).unwrap_err();
        assert!(matches!(err, McpError::InvalidParams(_)));

        let err = dispatcher
            .dispatch("tools/call", Some(&json!({"arguments": {}})))
            .unwrap_err();
        assert!(matches!(err, McpError::InvalidParams(_)));
    }

    #[test]
    fn unknown_tool_reported() {
        let mut dispatcher = ready(Registry::default());
        let err = dispatcher
            .dispatch("tools/call", Some(&json!({"name": "nope"})))
            .unwrap_err();
        assert_eq!(err, McpError::UnknownTool("nope".to_string()));
    }

    #[test]
    fn tool_receives_empty_object_when_arguments_omitted() {
        fn describe(args: Value) -> Result<ToolCallResult, McpError> {
            Ok(ToolCallResult::text(args.to_string()))
        }
        let mut dispatcher = ready(registry_with("describe", describe));
        let result = dispatcher
            .dispatch("tools/call", Some(&json!({"name": "describe"})))
            .unwrap();
        assert_eq!(result["content"][0]["text"], "{}");
    }

    #[test]
    fn panicking_tool_becomes_internal_error() {
        fn boom(_: Value) -> Result<ToolCallResult, McpError> {
            panic!("boom")
        }
        let mut dispatcher = ready(registry_with("boom", boom));
        let msg = parse_message(
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"boom"}}"#,
        )
        .unwrap();

        let err = dispatcher.handle(&msg).unwrap().unwrap_err();
        assert_eq!(err.id, RequestId::from(7));
        assert_eq!(err.error.code, -32603);
        assert!(err.error.message.contains("boom"));
    }

    #[test]
    fn notification_yields_no_response_but_runs() {
        let mut dispatcher = Dispatcher::new(Registry::default(), ServerInfo::default());
        let msg = parse_message(r#"{"jsonrpc":"2.0","method":"initialize"}"#).unwrap();
        assert!(dispatcher.handle(&msg).is_none());
        assert!(dispatcher.session().is_initialized());
    }

    #[test]
    fn prompt_arguments_must_be_strings() {
        let mut dispatcher = ready(Registry::default());
        let err = dispatcher
            .dispatch(
                "prompts/get",
                Some(&json!({"name": "greeting", "arguments": {"name": 5}})),
            )
            .unwrap_err();
        assert!(matches!(err, McpError::InvalidParams(_)));
    }
}
