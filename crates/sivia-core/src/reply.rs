//! Reply shape and the post-processing appended after sanitization.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::persona::PersonaConfig;
use crate::retrieval::RetrievalResult;

pub const SOURCES_FOOTER: &str = "📚 Fuentes confiables encontradas:";
pub const SUGGESTIONS_HEADER: &str = "🔎 Sugerencias:";

/// Reply category. Every engine reply is currently `Knowledge`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Intent {
    #[default]
    Knowledge,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Knowledge => "KNOWLEDGE",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub intent: Intent,
    pub text: String,
    /// Kept for callers that expect a third field; always empty.
    pub sources_echo: String,
}

impl Reply {
    pub fn knowledge(text: String) -> Self {
        Self {
            intent: Intent::Knowledge,
            text,
            sources_echo: String::new(),
        }
    }
}

/// Attach the sources block when retrieval accepted anything.
pub fn append_sources(text: &mut String, retrieval: Option<&RetrievalResult>) {
    if let Some(result) = retrieval {
        text.push_str("\n\n");
        text.push_str(SOURCES_FOOTER);
        text.push('\n');
        text.push_str(&result.sources_block());
    }
}

/// Short or low-confidence replies get follow-up suggestions.
pub fn needs_suggestions(text: &str, persona: &PersonaConfig) -> bool {
    if text.trim().chars().count() < persona.min_reply_chars {
        return true;
    }
    let lower = text.to_lowercase();
    persona
        .low_confidence_markers
        .iter()
        .any(|m| !m.is_empty() && lower.contains(&m.to_lowercase()))
}

pub fn append_suggestions(text: &mut String, persona: &PersonaConfig) {
    if !needs_suggestions(text, persona) || persona.suggestions.is_empty() {
        return;
    }
    text.push_str("\n\n");
    text.push_str(SUGGESTIONS_HEADER);
    for suggestion in &persona.suggestions {
        text.push_str("\n- ");
        text.push_str(suggestion);
    }
}
