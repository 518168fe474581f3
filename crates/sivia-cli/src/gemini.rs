//! Remote model client: Gemini `generateContent` with persistent chat history.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sivia_core::ModelConfig;

/// Sent as a header, never in the URL.
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug)]
pub enum ModelError {
    Transport(String),
    Status { status: u16, body: String },
    EmptyResponse,
    Decode(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Transport(msg) => write!(f, "model request failed: {msg}"),
            ModelError::Status { status, body } => {
                write!(f, "model returned HTTP {status}: {body}")
            }
            ModelError::EmptyResponse => write!(f, "model returned no text"),
            ModelError::Decode(msg) => write!(f, "unreadable model response: {msg}"),
        }
    }
}

impl std::error::Error for ModelError {}

/// A remote model able to open conversations.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn start_chat(&self) -> Result<Box<dyn ChatSession>, ModelError>;
}

/// One running conversation. The session remembers earlier exchanges.
#[async_trait]
pub trait ChatSession: Send {
    async fn send(&mut self, prompt: &str) -> Result<String, ModelError>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

impl Content {
    fn user(text: &str) -> Self {
        Self {
            role: "user",
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }

    fn model(text: &str) -> Self {
        Self {
            role: "model",
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: &'a [Content],
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

/// Text of the first candidate, thought parts skipped.
fn response_text(resp: &GenerateResponse) -> Option<String> {
    let content = resp.candidates.first()?.content.as_ref()?;
    let text: String = content
        .parts
        .iter()
        .filter(|p| !p.thought)
        .filter_map(|p| p.text.as_deref())
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Drop whole exchanges from the front until at most `limit` messages remain.
fn trim_history(history: &mut Vec<Content>, limit: usize) {
    while history.len() > limit {
        let drop = history.len().min(2);
        history.drain(..drop);
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct GeminiModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    history_limit: usize,
}

impl GeminiModel {
    pub fn new(config: &ModelConfig, api_key: &str) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::Transport(e.to_string()))?;
        let endpoint = format!(
            "{}/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model_path()
        );
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.to_string(),
            history_limit: config.chat_history_limit,
        })
    }
}

#[async_trait]
impl ChatModel for GeminiModel {
    async fn start_chat(&self) -> Result<Box<dyn ChatSession>, ModelError> {
        tracing::info!(endpoint = %self.endpoint, "opening model chat");
        Ok(Box::new(GeminiChat {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            history: Vec::new(),
            history_limit: self.history_limit,
        }))
    }
}

pub struct GeminiChat {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    history: Vec<Content>,
    history_limit: usize,
}

#[async_trait]
impl ChatSession for GeminiChat {
    async fn send(&mut self, prompt: &str) -> Result<String, ModelError> {
        let mut contents = self.history.clone();
        contents.push(Content::user(prompt));

        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&GenerateRequest {
                contents: &contents,
            })
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "model request rejected");
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Decode(e.without_url().to_string()))?;
        let text = response_text(&parsed).ok_or(ModelError::EmptyResponse)?;

        self.history.push(Content::user(prompt));
        self.history.push(Content::model(&text));
        trim_history(&mut self.history, self.history_limit);
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};

    #[derive(Clone, Default)]
    struct Recorded {
        bodies: Arc<Mutex<Vec<serde_json::Value>>>,
        keys: Arc<Mutex<Vec<String>>>,
    }

    async fn stub_model(
        State(rec): State<Recorded>,
        headers: axum::http::HeaderMap,
        uri: axum::http::Uri,
        Json(body): Json<serde_json::Value>,
    ) -> (StatusCode, Json<serde_json::Value>) {
        assert!(uri.query().is_none(), "unexpected query: {uri}");
        let key = headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        rec.keys.lock().unwrap().push(key.to_string());
        let prompt = body["contents"]
            .as_array()
            .and_then(|c| c.last())
            .and_then(|c| c["parts"][0]["text"].as_str())
            .unwrap_or_default()
            .to_string();
        rec.bodies.lock().unwrap().push(body);
        if prompt == "falla" {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"error": "overloaded"})),
            );
        }
        if prompt == "vacío" {
            return (StatusCode::OK, Json(serde_json::json!({"candidates": []})));
        }
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "candidates": [{"content": {"role": "model", "parts": [
                    {"text": "pensando", "thought": true},
                    {"text": format!("eco: {prompt}")}
                ]}}]
            })),
        )
    }

    async fn spawn_stub() -> (String, Recorded) {
        let rec = Recorded::default();
        let app = Router::new()
            .route("/v1beta/{*rest}", post(stub_model))
            .with_state(rec.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v1beta"), rec)
    }

    fn config(base_url: &str, limit: usize) -> ModelConfig {
        ModelConfig {
            api_key: Some("k-123".to_string()),
            base_url: base_url.to_string(),
            chat_history_limit: limit,
            timeout_secs: 5,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_chat_keeps_history() {
        let (base, rec) = spawn_stub().await;
        let model = GeminiModel::new(&config(&base, 20), "k-123").unwrap();
        let mut chat = model.start_chat().await.unwrap();

        assert_eq!(chat.send("hola").await.unwrap(), "eco: hola");
        assert_eq!(chat.send("otra").await.unwrap(), "eco: otra");

        let bodies = rec.bodies.lock().unwrap();
        assert_eq!(bodies[0]["contents"].as_array().unwrap().len(), 1);
        let second = bodies[1]["contents"].as_array().unwrap();
        assert_eq!(second.len(), 3);
        assert_eq!(second[1]["role"], "model");
        assert_eq!(second[1]["parts"][0]["text"], "eco: hola");
        assert_eq!(rec.keys.lock().unwrap()[0], "k-123");
    }

    #[tokio::test]
    async fn test_failed_call_not_recorded() {
        let (base, rec) = spawn_stub().await;
        let model = GeminiModel::new(&config(&base, 20), "k").unwrap();
        let mut chat = model.start_chat().await.unwrap();

        let err = chat.send("falla").await.unwrap_err();
        assert!(matches!(err, ModelError::Status { status: 503, .. }));
        let err = chat.send("vacío").await.unwrap_err();
        assert!(matches!(err, ModelError::EmptyResponse));

        chat.send("bien").await.unwrap();
        let bodies = rec.bodies.lock().unwrap();
        assert_eq!(bodies[2]["contents"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_is_transport_error() {
        let model = GeminiModel::new(&config("http://127.0.0.1:1/v1beta", 20), "k").unwrap();
        let mut chat = model.start_chat().await.unwrap();
        assert!(matches!(
            chat.send("hola").await.unwrap_err(),
            ModelError::Transport(_)
        ));
    }

    #[tokio::test]
    async fn test_transport_error_hides_key() {
        let secret = "AIza-secret-key-42";
        let model =
            GeminiModel::new(&config("http://127.0.0.1:1/v1beta", 20), secret).unwrap();
        let mut chat = model.start_chat().await.unwrap();
        let err = chat.send("hola").await.unwrap_err();
        let text = err.to_string();
        assert!(!text.contains(secret), "{text}");
        assert!(!text.contains("generateContent"), "{text}");
    }

    #[tokio::test]
    async fn test_decode_error_hides_key() {
        let app = Router::new().route(
            "/v1beta/{*rest}",
            post(|| async { (StatusCode::OK, "no es json") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let secret = "AIza-secret-key-43";
        let model =
            GeminiModel::new(&config(&format!("http://{addr}/v1beta"), 20), secret).unwrap();
        let mut chat = model.start_chat().await.unwrap();
        let err = chat.send("hola").await.unwrap_err();
        assert!(matches!(err, ModelError::Decode(_)));
        assert!(!err.to_string().contains(secret));
    }

    #[test]
    fn test_trim_history_drops_oldest_pairs() {
        let mut history: Vec<Content> = (0..6)
            .map(|i| {
                if i % 2 == 0 {
                    Content::user(&i.to_string())
                } else {
                    Content::model(&i.to_string())
                }
            })
            .collect();
        trim_history(&mut history, 4);
        assert_eq!(history.len(), 4);
        assert_eq!(history[0], Content::user("2"));

        trim_history(&mut history, 0);
        assert!(history.is_empty());
    }

    #[test]
    fn test_response_text_skips_thoughts() {
        let resp: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"parts": [
                {"text": "interno", "thought": true},
                {"text": "Hola "},
                {"text": "mundo"}
            ]}}]
        }))
        .unwrap();
        assert_eq!(response_text(&resp).as_deref(), Some("Hola mundo"));
        assert!(response_text(&GenerateResponse::default()).is_none());
    }
}
