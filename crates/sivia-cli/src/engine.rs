//! Cognitive engine: one turn is retrieve, compose, generate, sanitize,
//! post-process.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use sivia_core::{
    Composer, ConversationTurn, EngineConfig, PersonaConfig, Reply, Sanitizer, SessionStore,
    append_sources, append_suggestions,
};
use tokio::sync::{Mutex, OnceCell};

use crate::gemini::{ChatModel, ChatSession, GeminiModel};
use crate::retriever::TrustedRetriever;

/// Which generator the engine was built with. Fixed for the engine's lifetime.
pub enum ModelBinding {
    Live(Arc<dyn ChatModel>),
    /// No credentials: replies come from the offline template.
    Offline,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    Ready,
    Degraded,
}

impl EngineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineMode::Ready => "ready",
            EngineMode::Degraded => "degraded",
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum TurnPhase {
    Composing,
    AwaitingModel,
    Sanitizing,
    Delivered,
}

#[derive(Debug)]
pub enum EngineError {
    GenerationFailed(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::GenerationFailed(msg) => write!(f, "generation failed: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

pub struct CognitiveEngine {
    persona: PersonaConfig,
    sanitizer: Sanitizer,
    retriever: TrustedRetriever,
    binding: ModelBinding,
    chat: OnceCell<Mutex<Box<dyn ChatSession>>>,
    sessions: Arc<SessionStore>,
}

impl CognitiveEngine {
    pub fn new(
        persona: PersonaConfig,
        retriever: TrustedRetriever,
        binding: ModelBinding,
        sessions: Arc<SessionStore>,
    ) -> Self {
        let sanitizer = Sanitizer::new(persona.replacements.clone());
        Self {
            persona,
            sanitizer,
            retriever,
            binding,
            chat: OnceCell::new(),
            sessions,
        }
    }

    /// Engine wired to HTTP retrieval and, when a key is configured, Gemini.
    pub fn from_config(config: &EngineConfig) -> anyhow::Result<Self> {
        let retriever = TrustedRetriever::http(config.retrieval.clone())
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        let binding = match config.model.usable_key() {
            Some(key) => {
                let model = GeminiModel::new(&config.model, key)
                    .map_err(|e| anyhow::anyhow!("{e}"))?;
                ModelBinding::Live(Arc::new(model))
            }
            None => {
                tracing::warn!("no API key configured, running in degraded mode");
                ModelBinding::Offline
            }
        };
        let sessions = Arc::new(SessionStore::new(config.session.max_history));
        Ok(Self::new(
            config.persona.clone(),
            retriever,
            binding,
            sessions,
        ))
    }

    pub fn mode(&self) -> EngineMode {
        match self.binding {
            ModelBinding::Live(_) => EngineMode::Ready,
            ModelBinding::Offline => EngineMode::Degraded,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// The persistent chat, opened on first use. Concurrent first callers
    /// share one `start_chat`; a failed start is retried on the next turn.
    async fn ensure_chat(
        &self,
        model: &Arc<dyn ChatModel>,
    ) -> Result<&Mutex<Box<dyn ChatSession>>, EngineError> {
        self.chat
            .get_or_try_init(|| async {
                let session = model
                    .start_chat()
                    .await
                    .map_err(|e| EngineError::GenerationFailed(e.to_string()))?;
                Ok::<_, EngineError>(Mutex::new(session))
            })
            .await
    }

    async fn generate(&self, prompt: &str, input: &str) -> Result<String, EngineError> {
        match &self.binding {
            ModelBinding::Offline => Ok(self.persona.offline_reply(input)),
            ModelBinding::Live(model) => {
                let chat = self.ensure_chat(model).await?;
                let mut chat = chat.lock().await;
                chat.send(prompt).await.map_err(|e| {
                    tracing::error!("model call failed: {e}");
                    EngineError::GenerationFailed(e.to_string())
                })
            }
        }
    }

    /// One turn against explicit history. Retrieval problems never fail the
    /// turn; a model failure does.
    pub async fn respond(
        &self,
        input: &str,
        history: &[ConversationTurn],
    ) -> Result<Reply, EngineError> {
        let retrieval = self.retriever.retrieve(input).await;

        let sources = retrieval.as_ref().map_or(0, |r| r.sources().len());
        tracing::debug!(phase = ?TurnPhase::Composing, sources);
        let context = retrieval.as_ref().map(|r| r.context_text());
        let prompt = Composer::new(&self.persona).compose(input, context.as_deref(), history);

        tracing::debug!(
            phase = ?TurnPhase::AwaitingModel,
            prompt_chars = prompt.chars().count()
        );
        let raw = self.generate(&prompt, input).await?;

        tracing::debug!(phase = ?TurnPhase::Sanitizing);
        let mut text = self.sanitizer.sanitize(&raw);
        append_sources(&mut text, retrieval.as_ref());
        append_suggestions(&mut text, &self.persona);

        tracing::debug!(phase = ?TurnPhase::Delivered, reply_chars = text.chars().count());
        Ok(Reply::knowledge(text))
    }

    /// [`respond`](Self::respond) with history read from and written back to
    /// the session store. A failed turn records only the user's message.
    pub async fn respond_in_session(
        &self,
        session_id: &str,
        input: &str,
    ) -> Result<Reply, EngineError> {
        let history = self.sessions.recent(session_id, self.sessions.window());
        let result = self.respond(input, &history).await;
        self.sessions.append(session_id, ConversationTurn::user(input));
        if let Ok(reply) = &result {
            self.sessions
                .append(session_id, ConversationTurn::assistant(&reply.text));
        }
        result
    }
}
