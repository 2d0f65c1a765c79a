//! Configuration management for the Notion MCP agent.
//!
//! Configuration can be set via environment variables:
//! - `NOTION_API_KEY` - Required. Notion integration token passed to the MCP bridge.
//! - `OPENROUTER_API_KEY` - Optional. Model provider key; without it the agent
//!   rejects incoming messages but the server still starts.
//! - `DEFAULT_MODEL` - Optional. Model identifier in OpenRouter format.
//!   Defaults to `google/gemini-2.5-pro`.
//! - `HOST` / `PORT` - Optional. Also exposed as `--host` / `--port` flags.
//! - `MAX_ITERATIONS` - Optional. Maximum agent loop iterations. Defaults to `25`.
//! - `MCP_TIMEOUT_SECS` - Optional. Per-request bridge timeout. Defaults to `20`.

use std::time::Duration;

use thiserror::Error;

/// Notion API version sent alongside every bridge request.
pub const NOTION_VERSION: &str = "2022-06-28";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Notion integration token
    pub notion_api_key: String,

    /// OpenRouter API key, if configured
    pub openrouter_api_key: Option<String>,

    /// Model identifier (OpenRouter format)
    pub default_model: String,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Maximum iterations for the agent loop
    pub max_iterations: usize,

    /// Timeout for a single MCP bridge request
    pub mcp_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `NOTION_API_KEY` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let notion_api_key = std::env::var("NOTION_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("NOTION_API_KEY".to_string()))?;

        let openrouter_api_key = std::env::var("OPENROUTER_API_KEY").ok();

        let default_model = std::env::var("DEFAULT_MODEL")
            .unwrap_or_else(|_| "google/gemini-2.5-pro".to_string());

        let max_iterations = std::env::var("MAX_ITERATIONS")
            .unwrap_or_else(|_| "25".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("MAX_ITERATIONS".to_string(), format!("{e}")))?;

        let mcp_timeout_secs: u64 = std::env::var("MCP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "20".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("MCP_TIMEOUT_SECS".to_string(), format!("{e}"))
            })?;

        Ok(Self {
            notion_api_key,
            openrouter_api_key,
            default_model,
            host: "localhost".to_string(),
            port: 10001,
            max_iterations,
            mcp_timeout: Duration::from_secs(mcp_timeout_secs),
        })
    }

    /// Override the bind address (CLI flags take precedence over defaults).
    pub fn with_address(mut self, host: String, port: u16) -> Self {
        self.host = host;
        self.port = port;
        self
    }

    /// Public base URL of the agent, as advertised in the agent card.
    pub fn agent_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Header pair the Notion MCP bridge expects in `OPENAPI_MCP_HEADERS`.
    pub fn mcp_headers(&self) -> String {
        notion_mcp_headers(&self.notion_api_key)
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(notion_api_key: String) -> Self {
        Self {
            notion_api_key,
            openrouter_api_key: None,
            default_model: "google/gemini-2.5-pro".to_string(),
            host: "localhost".to_string(),
            port: 10001,
            max_iterations: 25,
            mcp_timeout: Duration::from_secs(20),
        }
    }
}

/// Serialize the fixed header pair for the Notion MCP bridge.
///
/// The bridge forwards these verbatim on every Notion API call, so the JSON
/// object must contain exactly the bearer authorization and the pinned
/// `Notion-Version`.
pub fn notion_mcp_headers(api_key: &str) -> String {
    serde_json::json!({
        "Authorization": format!("Bearer {api_key}"),
        "Notion-Version": NOTION_VERSION,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_contain_exactly_the_fixed_pair() {
        let headers = notion_mcp_headers("secret_abc123");
        let parsed: serde_json::Value = serde_json::from_str(&headers).unwrap();
        let obj = parsed.as_object().unwrap();

        assert_eq!(obj.len(), 2);
        assert_eq!(obj["Authorization"], "Bearer secret_abc123");
        assert_eq!(obj["Notion-Version"], "2022-06-28");
    }

    // One test covers both the missing and the dotenv-provided credential so
    // the env mutation cannot race a parallel case.
    #[test]
    fn test_from_env_requires_notion_api_key() {
        std::env::remove_var("NOTION_API_KEY");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "NOTION_API_KEY"));

        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");
        std::fs::write(&env_file, "NOTION_API_KEY=secret_from_dotenv\n").unwrap();
        dotenvy::from_path(&env_file).unwrap();

        let config = Config::from_env().unwrap();
        assert_eq!(config.notion_api_key, "secret_from_dotenv");
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 10001);
        assert_eq!(config.mcp_timeout, Duration::from_secs(20));

        std::env::remove_var("NOTION_API_KEY");
    }

    #[test]
    fn test_agent_url_uses_defaults() {
        let config = Config::new("secret_abc123".to_string());
        assert_eq!(config.agent_url(), "http://localhost:10001");
    }

    #[test]
    fn test_agent_url_reflects_overrides() {
        let config =
            Config::new("secret_abc123".to_string()).with_address("0.0.0.0".to_string(), 8080);
        assert_eq!(config.agent_url(), "http://0.0.0.0:8080");
    }
}
