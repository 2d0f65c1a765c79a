//! Toolset bound to a single stdio MCP bridge.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::llm::ToolDefinition;

use super::stdio::StdioMcpClient;
use super::types::{McpToolDescriptor, StdioServerParams};

/// Command that launches the Notion MCP bridge.
const NOTION_MCP_COMMAND: &str = "npx";
const NOTION_MCP_ARGS: [&str; 2] = ["-y", "@notionhq/notion-mcp-server"];
/// Environment override carrying the serialized header pair.
const NOTION_MCP_HEADERS_ENV: &str = "OPENAPI_MCP_HEADERS";

/// A set of tools served by one MCP bridge process.
///
/// The session is spawned lazily: `connect` runs in the background at server
/// start, and any tool access retries the connection if that attempt failed.
pub struct McpToolset {
    params: StdioServerParams,
    session: Mutex<Option<StdioMcpClient>>,
    tools: RwLock<Vec<McpToolDescriptor>>,
}

impl McpToolset {
    /// Create a toolset for an arbitrary stdio bridge.
    pub fn new(params: StdioServerParams) -> Self {
        Self {
            params,
            session: Mutex::new(None),
            tools: RwLock::new(Vec::new()),
        }
    }

    /// Create the Notion bridge toolset.
    ///
    /// `headers_json` is the serialized authorization pair from
    /// [`crate::config::notion_mcp_headers`].
    pub fn notion(headers_json: String, timeout: Duration) -> Self {
        let mut env = HashMap::new();
        env.insert(NOTION_MCP_HEADERS_ENV.to_string(), headers_json);

        Self::new(StdioServerParams {
            command: NOTION_MCP_COMMAND.to_string(),
            args: NOTION_MCP_ARGS.iter().map(|s| s.to_string()).collect(),
            env,
            timeout,
        })
    }

    /// The launch parameters (visible for diagnostics and tests).
    pub fn params(&self) -> &StdioServerParams {
        &self.params
    }

    /// Spawn the bridge, run the handshake, and discover tools.
    ///
    /// Idempotent: an already-connected toolset returns immediately.
    pub async fn connect(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return Ok(());
        }

        let mut client = StdioMcpClient::spawn(&self.params).await?;
        let init = client.initialize().await?;
        if let Some(server) = &init.server_info {
            info!(
                "Connected to MCP server '{}' (version {})",
                server.name,
                server.version.as_deref().unwrap_or("unknown")
            );
        }

        let tools = client.list_tools().await?;
        info!("Discovered {} MCP tools", tools.len());

        *self.tools.write().await = tools;
        *session = Some(client);
        Ok(())
    }

    /// Tool definitions in the shape the LLM expects.
    pub async fn definitions(&self) -> Result<Vec<ToolDefinition>> {
        self.connect().await?;
        let tools = self.tools.read().await;
        Ok(tools.iter().map(Self::definition_for).collect())
    }

    /// Names of the discovered tools.
    pub async fn tool_names(&self) -> Vec<String> {
        self.tools
            .read()
            .await
            .iter()
            .map(|t| t.name.clone())
            .collect()
    }

    /// Call a tool on the bridge and return its text output.
    pub async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<String> {
        self.connect().await?;
        let mut session = self.session.lock().await;
        let client = session
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("MCP bridge is not connected"))?;
        client.call_tool(name, arguments).await
    }

    /// Map an MCP tool descriptor to an LLM tool definition.
    fn definition_for(tool: &McpToolDescriptor) -> ToolDefinition {
        let parameters = if tool.input_schema.is_null() {
            serde_json::json!({ "type": "object", "properties": {} })
        } else {
            tool.input_schema.clone()
        };

        ToolDefinition::function(&tool.name, &tool.description, parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notion_launch_parameters() {
        let toolset = McpToolset::notion(
            r#"{"Authorization":"Bearer secret"}"#.to_string(),
            Duration::from_secs(20),
        );
        let params = toolset.params();

        assert_eq!(params.command, "npx");
        assert_eq!(params.args, vec!["-y", "@notionhq/notion-mcp-server"]);
        assert_eq!(params.timeout, Duration::from_secs(20));
        assert_eq!(
            params.env.get("OPENAPI_MCP_HEADERS").map(String::as_str),
            Some(r#"{"Authorization":"Bearer secret"}"#)
        );
        assert_eq!(params.env.len(), 1);
    }

    #[test]
    fn test_definition_for_defaults_missing_schema() {
        let tool = McpToolDescriptor {
            name: "API-post-search".to_string(),
            description: "Search Notion".to_string(),
            input_schema: serde_json::Value::Null,
        };

        let def = McpToolset::definition_for(&tool);
        assert_eq!(def.function.name, "API-post-search");
        assert_eq!(def.function.parameters["type"], "object");
    }

    #[test]
    fn test_definition_for_preserves_schema() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"]
        });
        let tool = McpToolDescriptor {
            name: "API-post-search".to_string(),
            description: String::new(),
            input_schema: schema.clone(),
        };

        let def = McpToolset::definition_for(&tool);
        assert_eq!(def.function.parameters, schema);
    }
}
