//! SIVIA conversation core.
//!
//! Persona and brand sanitization, prompt composition, the FAQ table, the
//! knowledge-base model, bounded session transcripts and the trusted-retrieval
//! policy. The engine that ties these to a remote model lives in `sivia-cli`.
//!
//! Zero I/O: no network, no filesystem, no opinions about transport.

pub mod compose;
pub mod config;
pub mod constants;
pub mod faq;
pub mod knowledge;
pub mod persona;
pub mod reply;
pub mod retrieval;
pub mod sanitize;
pub mod session;
pub mod time;

pub use compose::Composer;
pub use config::{EngineConfig, ModelConfig, ServerConfig, SessionConfig};
pub use faq::{FAQ_FALLBACK, FaqError, FaqTable};
pub use knowledge::KnowledgeBase;
pub use persona::PersonaConfig;
pub use reply::{Intent, Reply, append_sources, append_suggestions, needs_suggestions};
pub use retrieval::{RetrievalPolicy, RetrievalResult, RetrievedSource};
pub use sanitize::{ReplacementRule, Sanitizer};
pub use session::{Author, ConversationTurn, SessionStore};
pub use time::now_iso8601;
