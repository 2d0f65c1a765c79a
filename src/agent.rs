//! The Notion agent: a fixed instruction, one model, one MCP toolset.
//!
//! # Execution Flow
//! 1. Send system instruction + conversation to the LLM with the bridge's tools
//! 2. Execute any requested tool calls through the Notion MCP bridge
//! 3. Repeat until the LLM produces a final response or the loop bound trips

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::llm::{ChatMessage, LlmClient, Role};
use crate::mcp::McpToolset;

/// Display name declared in the agent card.
pub const AGENT_NAME: &str = "Notion Agent";

/// Description shared by the agent card and its single skill.
pub const AGENT_DESCRIPTION: &str =
    "An agent that interacts with Notion using MCP to read and summarize workspace content";

/// System instruction pinning the agent to Notion-only assistance.
pub const SYSTEM_INSTRUCTION: &str = "You are a Notion knowledge assistant. \
    Your purpose is to access, read, write and summarize data from connected Notion pages, \
    databases, or workspaces using the Notion MCP integration. \
    If a user asks for any information not available in Notion, politely tell them that you \
    can only assist with content and actions available through the Notion MCP integration. \
    Use the available MCP tools only for Notion operations like reading, writing, searching, \
    or summarizing pages.";

/// Errors that can occur while running the agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Model provider is not configured: set OPENROUTER_API_KEY")]
    MissingLlmCredential,

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Tool discovery failed: {0}")]
    ToolDiscovery(String),

    #[error("Max iterations reached: {0}")]
    MaxIterations(usize),

    #[error("LLM returned an empty response")]
    EmptyResponse,
}

/// Conversational agent bound to the Notion MCP toolset.
pub struct NotionAgent {
    model: String,
    llm: Option<Arc<dyn LlmClient>>,
    toolset: Arc<McpToolset>,
    max_iterations: usize,
}

impl NotionAgent {
    /// Assemble the agent from configuration.
    pub fn new(config: &Config, llm: Option<Arc<dyn LlmClient>>, toolset: Arc<McpToolset>) -> Self {
        info!("Creating Notion MCP agent (model {})", config.default_model);
        Self {
            model: config.default_model.clone(),
            llm,
            toolset,
            max_iterations: config.max_iterations,
        }
    }

    /// The toolset serving this agent.
    pub fn toolset(&self) -> &Arc<McpToolset> {
        &self.toolset
    }

    /// Answer one user request, running tool calls against the bridge as needed.
    pub async fn run(&self, user_text: &str) -> Result<String, AgentError> {
        let llm = self
            .llm
            .as_ref()
            .ok_or(AgentError::MissingLlmCredential)?;

        let tools = self
            .toolset
            .definitions()
            .await
            .map_err(|e| AgentError::ToolDiscovery(e.to_string()))?;

        let mut messages = vec![
            ChatMessage::new(Role::System, SYSTEM_INSTRUCTION),
            ChatMessage::new(Role::User, user_text),
        ];

        for iteration in 0..self.max_iterations {
            debug!("Agent iteration {}", iteration + 1);

            let response = llm
                .chat_completion(&self.model, &messages, Some(&tools))
                .await
                .map_err(|e| AgentError::Llm(e.to_string()))?;

            if let Some(tool_calls) = &response.tool_calls {
                if !tool_calls.is_empty() {
                    messages.push(ChatMessage::tool_request(
                        response.content.clone(),
                        tool_calls.clone(),
                    ));

                    for tool_call in tool_calls {
                        info!("Tool call: {}", tool_call.function.name);

                        let arguments = parse_arguments(&tool_call.function.arguments);
                        let result = match self
                            .toolset
                            .call_tool(&tool_call.function.name, arguments)
                            .await
                        {
                            Ok(output) => output,
                            Err(e) => format!("Error: {e}"),
                        };

                        messages.push(ChatMessage::tool_result(tool_call.id.clone(), result));
                    }

                    continue;
                }
            }

            return match response.content {
                Some(content) => Ok(content),
                None => Err(AgentError::EmptyResponse),
            };
        }

        Err(AgentError::MaxIterations(self.max_iterations))
    }
}

/// Parse a tool call's argument string, tolerating the empty case.
fn parse_arguments(raw: &str) -> serde_json::Value {
    if raw.trim().is_empty() {
        return serde_json::json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::json!({}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments_empty_becomes_object() {
        assert_eq!(parse_arguments(""), serde_json::json!({}));
        assert_eq!(parse_arguments("   "), serde_json::json!({}));
    }

    #[test]
    fn test_parse_arguments_passthrough() {
        let parsed = parse_arguments(r#"{"query": "roadmap"}"#);
        assert_eq!(parsed["query"], "roadmap");
    }

    #[test]
    fn test_parse_arguments_garbage_becomes_object() {
        assert_eq!(parse_arguments("not json"), serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_run_without_llm_credential_fails() {
        let config = Config::new("secret".to_string());
        let toolset = Arc::new(McpToolset::notion(
            config.mcp_headers(),
            config.mcp_timeout,
        ));
        let agent = NotionAgent::new(&config, None, toolset);

        let err = agent.run("summarize my notes").await.unwrap_err();
        assert!(matches!(err, AgentError::MissingLlmCredential));
    }
}
