//! HTTP server exposing the agent over the A2A convention.
//!
//! Routes:
//! - `GET /.well-known/agent.json` - the agent card
//! - `POST /` - JSON-RPC 2.0 dispatch (message/send, message/stream, tasks/*)
//! - `GET /api/health` - liveness probe

use std::sync::Arc;

use axum::{
    extract::State,
    response::{
        sse::{Event, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use futures::StreamExt;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::a2a::{
    A2aRequest, A2aResponse, AgentCapabilities, AgentCard, AgentSkill, InMemoryTaskStore,
    MessageSendParams, RequestHandler, INVALID_PARAMS, PARSE_ERROR,
};
use crate::agent::{NotionAgent, AGENT_DESCRIPTION, AGENT_NAME};
use crate::config::Config;
use crate::llm::{LlmClient, OpenRouterClient};
use crate::mcp::McpToolset;

/// Shared application state.
pub struct AppState {
    pub card: AgentCard,
    pub handler: RequestHandler,
}

/// Build the agent card. Everything except `url` is fixed.
pub fn agent_card(config: &Config) -> AgentCard {
    AgentCard {
        name: AGENT_NAME.to_string(),
        description: AGENT_DESCRIPTION.to_string(),
        url: config.agent_url(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        default_input_modes: vec!["text".to_string(), "text/plain".to_string()],
        default_output_modes: vec!["text".to_string(), "text/plain".to_string()],
        capabilities: AgentCapabilities { streaming: true },
        skills: vec![AgentSkill {
            id: "notion_workspace".to_string(),
            name: "notion_workspace_qa".to_string(),
            description: AGENT_DESCRIPTION.to_string(),
            tags: vec![
                "notion".to_string(),
                "workspace".to_string(),
                "search".to_string(),
                "summarize".to_string(),
            ],
            examples: vec![
                "Summarize the meeting notes page".to_string(),
                "What databases exist in my workspace?".to_string(),
            ],
        }],
    }
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let llm: Option<Arc<dyn LlmClient>> = config
        .openrouter_api_key
        .clone()
        .map(|key| Arc::new(OpenRouterClient::new(key)) as Arc<dyn LlmClient>);
    if llm.is_none() {
        warn!("OPENROUTER_API_KEY not set; incoming messages will be rejected");
    }

    info!("Loading Notion MCP tools...");
    let toolset = Arc::new(McpToolset::notion(config.mcp_headers(), config.mcp_timeout));
    // Connect in the background; tool access reconnects on demand if this fails.
    {
        let toolset = Arc::clone(&toolset);
        tokio::spawn(async move {
            if let Err(e) = toolset.connect().await {
                warn!("Could not connect to Notion MCP bridge: {}", e);
            }
        });
    }

    let agent = Arc::new(NotionAgent::new(&config, llm, toolset));
    let handler = RequestHandler::new(agent, Arc::new(InMemoryTaskStore::new()));

    let state = Arc::new(AppState {
        card: agent_card(&config),
        handler,
    });

    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Assemble the router.
fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/.well-known/agent.json", get(get_agent_card))
        .route("/", post(jsonrpc))
        .route("/api/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the agent card.
async fn get_agent_card(State(state): State<Arc<AppState>>) -> Json<AgentCard> {
    Json(state.card.clone())
}

/// Health check.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "agent": AGENT_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// JSON-RPC entry point. `message/stream` answers with SSE, everything else
/// with a single JSON response.
async fn jsonrpc(State(state): State<Arc<AppState>>, body: String) -> Response {
    let request: A2aRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            return Json(A2aResponse::error(
                serde_json::Value::Null,
                PARSE_ERROR,
                e.to_string(),
            ))
            .into_response();
        }
    };

    if request.method == "message/stream" {
        return match serde_json::from_value::<MessageSendParams>(request.params.clone()) {
            Ok(params) => {
                let stream = state
                    .handler
                    .message_stream(request.id, params)
                    .map(|response| Event::default().json_data(&response));
                Sse::new(stream).into_response()
            }
            Err(e) => Json(A2aResponse::error(
                request.id,
                INVALID_PARAMS,
                e.to_string(),
            ))
            .into_response(),
        };
    }

    Json(state.handler.dispatch(request).await).into_response()
}

/// Wait for ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_card_default_address() {
        let card = agent_card(&Config::new("secret".to_string()));

        assert_eq!(card.url, "http://localhost:10001");
        assert_eq!(card.name, "Notion Agent");
        assert!(card.capabilities.streaming);
        assert_eq!(card.skills.len(), 1);
        assert_eq!(
            card.default_input_modes,
            vec!["text".to_string(), "text/plain".to_string()]
        );
    }

    #[test]
    fn test_agent_card_only_url_varies_with_address() {
        let default_card = agent_card(&Config::new("secret".to_string()));
        let moved_card = agent_card(
            &Config::new("secret".to_string()).with_address("0.0.0.0".to_string(), 9999),
        );

        let mut a = serde_json::to_value(&default_card).unwrap();
        let mut b = serde_json::to_value(&moved_card).unwrap();

        assert_eq!(a["url"], "http://localhost:10001");
        assert_eq!(b["url"], "http://0.0.0.0:9999");

        // Strip the one varying field; the rest must be identical.
        a.as_object_mut().unwrap().remove("url");
        b.as_object_mut().unwrap().remove("url");
        assert_eq!(a, b);
    }

    #[test]
    fn test_agent_card_is_independent_of_credential() {
        let a = agent_card(&Config::new("secret-one".to_string()));
        let b = agent_card(&Config::new("secret-two".to_string()));

        assert_eq!(
            serde_json::to_value(&a).unwrap(),
            serde_json::to_value(&b).unwrap()
        );
    }

    #[test]
    fn test_parse_request_with_string_id() {
        let request: A2aRequest = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":"abc","method":"tasks/get","params":{"id":"t-1"}}"#,
        )
        .unwrap();

        assert_eq!(request.method, "tasks/get");
        assert_eq!(request.id, serde_json::json!("abc"));
    }
}
