//! # Notion MCP Agent
//!
//! A single conversational agent that proxies natural-language requests to
//! the Notion API through the Notion MCP bridge, exposed over HTTP with the
//! agent-to-agent (A2A) JSON-RPC convention.
//!
//! ## Architecture
//!
//! ```text
//!   A2A client ──► axum server ──► RequestHandler ──► NotionAgent
//!                  (api)           (a2a)              (agent)
//!                                                        │
//!                                              LLM ◄─────┤
//!                                              (llm)     ▼
//!                                                   McpToolset ──► npx @notionhq/notion-mcp-server
//!                                                   (mcp)          (subprocess, JSON-RPC over stdio)
//! ```
//!
//! ## Request Flow
//! 1. Receive a `message/send` (or `message/stream`) request
//! 2. Track it as a task in the in-memory store
//! 3. Run the agent loop: model call, MCP tool calls, repeat
//! 4. Resolve the task with the agent's reply or the failure

pub mod a2a;
pub mod agent;
pub mod api;
pub mod config;
pub mod llm;
pub mod mcp;

pub use config::Config;
