//! Model Context Protocol (MCP) server implementation.
//!
//! The server communicates over stdio transport using newline-delimited
//! JSON-RPC 2.0 messages and handles one request at a time.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          MCP Server                          │
//! │                                                              │
//! │   ┌─────────────┐    ┌─────────────┐    ┌──────────────┐     │
//! │   │  Transport  │───▶│  Protocol   │───▶│  Dispatcher  │     │
//! │   │   (lines)   │    │  (codec)    │    │  (methods)   │     │
//! │   └─────────────┘    └─────────────┘    └──────────────┘     │
//! │                                           │          │       │
//! │                                           ▼          ▼       │
//! │                                   ┌──────────┐ ┌──────────┐  │
//! │                                   │ Session  │ │ Registry │  │
//! │                                   └──────────┘ └──────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod capability;
pub mod dispatch;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod transport;

pub use dispatch::{Dispatcher, Method, ServerInfo};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use registry::Registry;
pub use server::McpServer;
pub use transport::{LineTransport, StdioTransport};
