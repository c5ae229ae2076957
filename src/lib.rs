//! mcp-stdio-server: a Model Context Protocol server over stdio
//!
//! This library implements the request dispatch and protocol state machine of
//! an MCP server: JSON-RPC envelopes in and out, one line per message, with
//! tools, resources and prompts served from a registry built at startup.
//!
//! # Architecture
//!
//! - **Session**: `initialize` must complete before anything else is served
//! - **Dispatcher**: a closed set of methods, each with typed params
//! - **Registry**: tools, resources and prompts, fixed after startup
//!
//! # Modules
//!
//! - [`catalog`] — Built-in tools, resources and prompts
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`mcp`] — MCP protocol implementation

pub mod catalog;
pub mod config;
pub mod error;
pub mod mcp;
