use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use sivia_core::{FaqTable, now_iso8601};
use sivia_store::KnowledgeFile;

use crate::engine::CognitiveEngine;

/// Session used when a caller does not name one.
const DEFAULT_SESSION: &str = "mcp";

#[derive(Clone)]
pub struct SiviaServer {
    engine: Arc<CognitiveEngine>,
    knowledge: KnowledgeFile,
    tool_router: ToolRouter<Self>,
}

impl SiviaServer {
    pub fn new(engine: Arc<CognitiveEngine>, knowledge: KnowledgeFile) -> Self {
        Self {
            engine,
            knowledge,
            tool_router: Self::tool_router(),
        }
    }
}

fn json_result(value: &serde_json::Value) -> CallToolResult {
    CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(value).unwrap_or_default(),
    )])
}

// --- Tool parameter types ---

#[derive(Debug, Deserialize, JsonSchema)]
struct ChatRequest {
    /// The user's message
    message: String,
    /// Conversation id. Turns with the same id share recent history.
    session_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct FaqRequest {
    /// Question to match against the FAQ table
    message: String,
}

#[tool_router]
impl SiviaServer {
    #[tool(
        description = "Ask SIVIA a question. Runs a full assistant turn: optional trusted web lookup (only when the message asks for sources, e.g. 'buscar web sobre ...'), prompt composition with recent session history, generation and persona cleanup. Returns the reply text."
    )]
    async fn sivia_chat(
        &self,
        Parameters(req): Parameters<ChatRequest>,
    ) -> Result<CallToolResult, McpError> {
        let message = req.message.trim();
        if message.is_empty() {
            return Err(McpError::invalid_params("message must not be empty", None));
        }
        let session_id = req
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SESSION);

        let reply = self
            .engine
            .respond_in_session(session_id, message)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        Ok(json_result(&serde_json::json!({
            "response": reply.text,
            "type": reply.intent,
            "timestamp": now_iso8601(),
            "session_id": session_id,
            "mode": self.engine.mode(),
        })))
    }

    #[tool(description = "Look up a canned answer in the static FAQ table. No model call.")]
    async fn sivia_faq(
        &self,
        Parameters(req): Parameters<FaqRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(json_result(&serde_json::json!({
            "reply": FaqTable::builtin().reply(&req.message),
        })))
    }

    #[tool(description = "Return the local knowledge base as a JSON object of topic key to answer.")]
    async fn sivia_knowledge(&self) -> Result<CallToolResult, McpError> {
        let kb = self
            .knowledge
            .load()
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let value =
            serde_json::to_value(&kb).map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(json_result(&value))
    }
}

#[tool_handler]
impl ServerHandler for SiviaServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "SIVIA is a Spanish-speaking student-council assistant.\n\n\
                 - sivia_chat: ask anything. Pass a stable session_id to keep context between turns. \
                   Include 'buscar web' or 'fuente' in the message to ground the answer in trusted \
                   (.org/.gob/.gov/.edu) sources.\n\
                 - sivia_faq: quick canned answers for greetings and common questions.\n\
                 - sivia_knowledge: the stored knowledge base (council and kiosk facts)."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
