//! HTTP API: chat, FAQ, knowledge and health routes over one shared engine.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sivia_core::{FaqTable, now_iso8601};
use sivia_store::KnowledgeFile;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::engine::{CognitiveEngine, EngineError, EngineMode};

pub const SESSION_COOKIE: &str = "sivia_sid";
const GENERATION_FAILED: &str = "generation failed";

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CognitiveEngine>,
    pub knowledge: KnowledgeFile,
}

// --- Request / response bodies ---

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
    #[serde(rename = "type")]
    kind: String,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct PromptRequest {
    #[serde(default)]
    prompt: String,
}

#[derive(Debug, Serialize)]
struct PromptReply {
    reply: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    mode: EngineMode,
    sessions: usize,
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.to_string(),
        }
    }

    fn internal(message: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }

    /// Upstream failure details stay in the server log.
    fn generation(err: EngineError) -> Self {
        tracing::error!("chat turn failed: {err}");
        Self::internal(GENERATION_FAILED.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(&rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

// --- Session cookie ---

fn cookie_value<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim())
}

fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Session id from the cookie, or a fresh one the caller must set.
fn session_from(headers: &HeaderMap) -> (String, bool) {
    match cookie_value(headers, SESSION_COOKIE).filter(|id| is_valid_session_id(id)) {
        Some(id) => (id.to_string(), false),
        None => (Uuid::new_v4().to_string(), true),
    }
}

fn with_session_cookie(mut response: Response, session_id: &str, is_new: bool) -> Response {
    if is_new {
        let cookie = format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

fn require_text(text: &str, field: &str) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        Err(ApiError::bad_request(&format!("'{field}' must not be empty")))
    } else {
        Ok(())
    }
}

// --- Handlers ---

async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatMessage>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    require_text(&req.message, "message")?;
    let (session_id, is_new) = session_from(&headers);
    let reply = state
        .engine
        .respond_in_session(&session_id, req.message.trim())
        .await
        .map_err(ApiError::generation)?;
    let body = ChatResponse {
        response: reply.text,
        kind: reply.intent.to_string(),
        timestamp: now_iso8601(),
    };
    Ok(with_session_cookie(Json(body).into_response(), &session_id, is_new))
}

async fn api_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    require_text(&req.prompt, "prompt")?;
    let (session_id, is_new) = session_from(&headers);
    let reply = state
        .engine
        .respond_in_session(&session_id, req.prompt.trim())
        .await
        .map_err(ApiError::generation)?;
    let body = PromptReply { reply: reply.text };
    Ok(with_session_cookie(Json(body).into_response(), &session_id, is_new))
}

async fn api_faq(
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Result<Json<PromptReply>, ApiError> {
    let Json(req) = payload?;
    require_text(&req.prompt, "prompt")?;
    Ok(Json(PromptReply {
        reply: FaqTable::builtin().reply(&req.prompt).to_string(),
    }))
}

async fn knowledge(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let kb = state
        .knowledge
        .load()
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let value = serde_json::to_value(&kb).map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(value))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        mode: state.engine.mode(),
        sessions: state.engine.sessions().session_count(),
    })
}

pub fn router(state: AppState, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/chat", post(chat))
        .route("/api/chat", post(api_chat))
        .route("/api/faq", post(api_faq))
        .route("/knowledge", get(knowledge))
        .route("/health", get(health))
        .with_state(state);

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(cors).layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

pub async fn serve(state: AppState, addr: SocketAddr, static_dir: Option<&Path>) -> Result<()> {
    let app = router(state, static_dir);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("HTTP API listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")
}
