use crate::persona::PersonaConfig;
use crate::session::{Author, ConversationTurn};

/// Builds the single text prompt sent to the remote model.
///
/// Sections, in order, separated by a blank line; empty ones are skipped:
/// persona instructions, recent conversation, web context, scripted facts,
/// the question, the closing tone instruction.
pub struct Composer<'a> {
    persona: &'a PersonaConfig,
}

impl<'a> Composer<'a> {
    pub fn new(persona: &'a PersonaConfig) -> Self {
        Self { persona }
    }

    pub fn compose(
        &self,
        user_input: &str,
        retrieved_context: Option<&str>,
        history: &[ConversationTurn],
    ) -> String {
        let sections = [
            self.persona.system_prompt(),
            history_block(history),
            web_block(retrieved_context),
            self.scripted_block(user_input),
            format!("PREGUNTA: {user_input}"),
            self.persona.closing_instruction.trim().to_string(),
        ];

        let mut prompt = sections
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        prompt.push('\n');
        prompt
    }

    fn scripted_block(&self, user_input: &str) -> String {
        if self.persona.scripted_facts.is_empty() || !self.persona.mentions_topic(user_input) {
            return String::new();
        }
        let facts: Vec<String> = self
            .persona
            .scripted_facts
            .iter()
            .map(|f| format!("- {f}"))
            .collect();
        let mut block = format!("PROPUESTAS DE LA LISTA Y SIVIA:\n{}", facts.join("\n"));
        let closing = self.persona.scripted_closing.trim();
        if !closing.is_empty() {
            block.push_str("\n\n");
            block.push_str(closing);
        }
        block
    }
}

fn history_block(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = history
        .iter()
        .map(|turn| {
            let who = match turn.author {
                Author::User => "usuario",
                Author::Assistant => "asistente",
            };
            format!("{who}: {}", turn.text)
        })
        .collect();
    format!("CONVERSACIÓN RECIENTE:\n{}", lines.join("\n"))
}

fn web_block(context: Option<&str>) -> String {
    match context.map(str::trim) {
        Some(text) if !text.is_empty() => format!("INFORMACIÓN WEB RELEVANTE:\n{text}"),
        _ => String::new(),
    }
}
