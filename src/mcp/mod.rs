//! MCP (Model Context Protocol) client for the Notion tool bridge.
//!
//! The bridge is an external subprocess spoken to over stdin/stdout with
//! line-delimited JSON-RPC 2.0. This module owns the process lifecycle,
//! the handshake, tool discovery, and tool invocation.

mod stdio;
mod toolset;
mod types;

pub use stdio::StdioMcpClient;
pub use toolset::McpToolset;
pub use types::{
    InitializeResult, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    McpCallToolResponse, McpContent, McpToolDescriptor, McpToolsResponse, StdioServerParams,
};
