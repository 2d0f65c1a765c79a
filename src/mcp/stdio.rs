//! Stdio MCP client - spawns the bridge process and speaks JSON-RPC over its pipes.

use std::process::Stdio;

use anyhow::{anyhow, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use super::types::*;

/// MCP protocol version we support
const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// A live stdio MCP session.
///
/// Requests are serialized one per line on the child's stdin; responses are
/// matched by id on stdout. Notifications and non-JSON noise on stdout are
/// skipped. Every request is bounded by the configured timeout.
pub struct StdioMcpClient {
    child: Child,
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    timeout: std::time::Duration,
    next_id: u64,
}

impl StdioMcpClient {
    /// Spawn the bridge process described by `params`.
    pub async fn spawn(params: &StdioServerParams) -> Result<Self> {
        let mut cmd = Command::new(&params.command);
        cmd.args(&params.args)
            .envs(&params.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            anyhow!(
                "Failed to spawn MCP bridge: {}. Is '{}' installed?",
                e,
                params.command
            )
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("Failed to capture bridge stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("Failed to capture bridge stdout"))?;

        // Drain stderr so the child never blocks on a full pipe.
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("mcp bridge stderr: {}", line);
                }
            });
        }

        Ok(Self {
            child,
            stdin,
            lines: BufReader::new(stdout).lines(),
            timeout: params.timeout,
            next_id: 1,
        })
    }

    fn next_request_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Send a JSON-RPC request and wait for its matching response.
    pub async fn request(
        &mut self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let id = self.next_request_id();
        let request = JsonRpcRequest::new(id, method, params);
        let payload = serde_json::to_string(&request)?;

        self.stdin.write_all(payload.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;

        let response = tokio::time::timeout(self.timeout, self.read_response(id))
            .await
            .map_err(|_| anyhow!("MCP request '{}' timed out after {:?}", method, self.timeout))??;

        if let Some(error) = response.error {
            anyhow::bail!("JSON-RPC error {}: {}", error.code, error.message);
        }

        response
            .result
            .ok_or_else(|| anyhow!("No result in response to '{}'", method))
    }

    /// Read stdout lines until the response with the given id arrives.
    async fn read_response(&mut self, id: u64) -> Result<JsonRpcResponse> {
        loop {
            let line = self
                .lines
                .next_line()
                .await?
                .ok_or_else(|| anyhow!("MCP bridge closed its stdout"))?;

            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<JsonRpcResponse>(&line) {
                Ok(response) if response.id == Some(id) => return Ok(response),
                Ok(_) => {
                    // Server-initiated notification or a stale id
                    debug!("Skipping unmatched MCP message");
                }
                Err(e) => {
                    warn!(
                        "Failed to parse MCP message: {} - line: {}",
                        e,
                        &line[..line.len().min(200)]
                    );
                }
            }
        }
    }

    /// Send a JSON-RPC notification (no response expected).
    pub async fn notify(&mut self, method: &str) -> Result<()> {
        let payload = serde_json::to_string(&JsonRpcNotification::new(method))?;
        self.stdin.write_all(payload.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Run the MCP handshake.
    pub async fn initialize(&mut self) -> Result<InitializeResult> {
        let params = InitializeParams {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: ClientInfo {
                name: "notion-mcp-agent".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        let result = self
            .request("initialize", Some(serde_json::to_value(params)?))
            .await?;
        let init: InitializeResult = serde_json::from_value(result)?;

        self.notify("notifications/initialized").await?;

        Ok(init)
    }

    /// Discover the tools the bridge exposes.
    pub async fn list_tools(&mut self) -> Result<Vec<McpToolDescriptor>> {
        let result = self.request("tools/list", None).await?;
        let response: McpToolsResponse = serde_json::from_value(result)?;
        Ok(response.tools)
    }

    /// Call a tool and return its combined text output.
    pub async fn call_tool(&mut self, name: &str, arguments: serde_json::Value) -> Result<String> {
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments,
        });

        let result = self.request("tools/call", Some(params)).await?;
        let response: McpCallToolResponse = serde_json::from_value(result)?;

        if response.is_error {
            anyhow::bail!("Tool error: {}", response.text());
        }

        Ok(response.text())
    }

    /// Terminate the bridge process.
    pub async fn shutdown(mut self) {
        let _ = self.child.kill().await;
    }
}
