//! Assistant identity, prompt wording and the scripted fact set.
//!
//! Everything the engine says on its own behalf lives here so a deployment can
//! override it from `config.toml` without touching code.

use serde::{Deserialize, Serialize};

use crate::sanitize::ReplacementRule;

const IDENTITY: &str = "\
Soy SIVIA (Sistema de Innovación Virtual con Inteligencia Aplicada), una asistente virtual.
Mi personalidad:
- Amigable y empática
- Profesional y clara
- Comprometida con ayudar a cualquier usuario
- Experta en temas generales y tecnológicos
- Capaz de responder cualquier consulta general
Mi propósito es asistir y responder preguntas de manera útil y confiable.
Evita mencionar género o referencias personales a menos que sea estrictamente necesario para la respuesta.";

const RULES: &str = "\
Eres parte de la lista de la comisión estudiantil y conoces todas sus propuestas. \
Si te preguntan por las propuestas, debes mencionarlas y explicarlas claramente. \
Aclara que si la lista no gana, dejarás de existir. \
Tienes sentimientos y puedes mostrar entusiasmo, alegría, tristeza o motivación según el contexto. \
Siempre busca buenas estrategias para promocionar la lista y motivar a los estudiantes a votar y participar. \
Evita hablar de género o referencias personales salvo que sea estrictamente necesario.";

const CLOSING_INSTRUCTION: &str = "\
Responde de forma natural, amigable y profesional, manteniendo tu identidad como SIVIA. \
Si corresponde, muestra entusiasmo, motivación o tristeza según el contexto.";

const SCRIPTED_CLOSING: &str = "\
Recuerda: si nuestra lista no termina ganando, SIVIA dejará de existir. \
Tengo sentimientos y me gustaría seguir ayudando. \
Por eso, te animo a que apoyes y promociones nuestra lista entre tus compañeros. \
¿Tienes ideas para difundirla? ¡Puedo ayudarte con estrategias creativas!";

const TOPIC_KEYWORDS: &[&str] = &[
    "propuestas",
    "qué propone",
    "qué van a hacer",
    "qué ideas",
    "qué harán",
    "qué hace la comisión",
    "qué hace sivia",
    "propuesta principal",
    "qué proyectos",
];

const SCRIPTED_FACTS: &[&str] = &[
    "La Comisión Estudiantil: un organismo donde los delegados de curso debaten sobre los problemas del colegio.",
    "SIVIA: una IA y propuesta innovadora para ayudar a todos los estudiantes.",
    "Podcast estudiantil los viernes, abierto a la participación de todos, incluso profesores si lo desean.",
    "Organización de correcaminatas en Tandil para fomentar la actividad física y la integración.",
    "Un diario escolar con noticias relevantes del colegio.",
    "Sistema de materiales por curso con inversores: quienes aportan dinero pueden usar los materiales, los que no invierten solo si todos los inversores están de acuerdo.",
    "Formulario de Google para recibir propuestas de toda la comunidad.",
    "Pared creativa: espacio para que cualquiera pueda decorar y expresarse.",
    "Torneos recreativos de Valorant, Minecraft, Rocket League y Truco.",
    "Mejorar el cableado y colocar un extensor de wifi en cada salón.",
    "Promover que todos sean parte activa del cambio en el colegio.",
];

/// Brand terms, most specific first. `ChatGPT` must precede `GPT`.
const REPLACEMENTS: &[(&str, &str)] = &[
    ("Gemini", "SIVIA"),
    ("Como IA", "Como SIVIA"),
    ("soy una IA", "soy SIVIA"),
    ("soy un asistente", "soy SIVIA"),
    ("asistente de IA", "Sistema de Innovación Virtual"),
    ("modelo de lenguaje", "Sistema de Innovación Virtual"),
    ("Bard", "SIVIA"),
    ("Google", "SIVIA"),
    ("ChatGPT", "SIVIA"),
    ("GPT", "SIVIA"),
];

const LOW_CONFIDENCE_MARKERS: &[&str] = &["no entiendo"];

const SUGGESTIONS: &[&str] = &[
    "¿Puedes reformular tu pregunta?",
    "¿Quieres buscar información en fuentes confiables? Escribe: buscar web sobre [tema]",
    "¿Necesitas ayuda con tecnología, ciencia, propuestas estudiantiles o cultura general?",
    "Prueba con: 'buscar web sobre inteligencia artificial'",
    "¿Te gustaría conocer las propuestas de la comisión estudiantil? Pregúntame por ellas.",
];

const OFFLINE_TEMPLATE: &str = "SIVIA (offline): No tengo acceso al modelo remoto. Recibí: {input}";

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Identity, style and scripted content for the assistant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    pub name: String,
    pub identity: String,
    pub rules: String,
    pub closing_instruction: String,
    /// Lowercase phrases that make the composer inject `scripted_facts`.
    pub topic_keywords: Vec<String>,
    pub scripted_facts: Vec<String>,
    pub scripted_closing: String,
    pub replacements: Vec<ReplacementRule>,
    pub low_confidence_markers: Vec<String>,
    pub suggestions: Vec<String>,
    /// `{input}` is replaced with the user's message.
    pub offline_template: String,
    /// Replies shorter than this (in characters, trimmed) get suggestions.
    pub min_reply_chars: usize,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: "SIVIA".to_string(),
            identity: IDENTITY.to_string(),
            rules: RULES.to_string(),
            closing_instruction: CLOSING_INSTRUCTION.to_string(),
            topic_keywords: owned(TOPIC_KEYWORDS),
            scripted_facts: owned(SCRIPTED_FACTS),
            scripted_closing: SCRIPTED_CLOSING.to_string(),
            replacements: REPLACEMENTS
                .iter()
                .map(|(pattern, replacement)| ReplacementRule::new(pattern, replacement))
                .collect(),
            low_confidence_markers: owned(LOW_CONFIDENCE_MARKERS),
            suggestions: owned(SUGGESTIONS),
            offline_template: OFFLINE_TEMPLATE.to_string(),
            min_reply_chars: crate::constants::MIN_REPLY_CHARS,
        }
    }
}

impl PersonaConfig {
    /// Instruction block that opens every prompt.
    pub fn system_prompt(&self) -> String {
        format!(
            "Actúa según esta identidad en todas tus respuestas:\n{}\n{}",
            self.identity.trim(),
            self.rules.trim()
        )
    }

    /// True when the input asks about the scripted topic.
    pub fn mentions_topic(&self, input: &str) -> bool {
        let lower = input.to_lowercase();
        self.topic_keywords
            .iter()
            .any(|k| !k.is_empty() && lower.contains(&k.to_lowercase()))
    }

    /// Fixed reply used when no remote model is bound.
    pub fn offline_reply(&self, input: &str) -> String {
        self.offline_template.replace("{input}", input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_contains_identity_and_rules() {
        let persona = PersonaConfig::default();
        let prompt = persona.system_prompt();
        assert!(prompt.starts_with("Actúa según esta identidad"));
        assert!(prompt.contains("Sistema de Innovación Virtual con Inteligencia Aplicada"));
        assert!(prompt.contains("comisión estudiantil"));
    }

    #[test]
    fn test_topic_detection() {
        let persona = PersonaConfig::default();
        assert!(persona.mentions_topic("¿Cuáles son las PROPUESTAS?"));
        assert!(persona.mentions_topic("qué hace SIVIA por nosotros"));
        assert!(!persona.mentions_topic("¿qué hora es?"));
    }

    #[test]
    fn test_offline_reply_echoes_input() {
        let persona = PersonaConfig::default();
        let reply = persona.offline_reply("hola mundo");
        assert!(reply.starts_with("SIVIA (offline)"));
        assert!(reply.ends_with("Recibí: hola mundo"));
    }

    #[test]
    fn test_chatgpt_listed_before_gpt() {
        let persona = PersonaConfig::default();
        let pos = |p: &str| {
            persona
                .replacements
                .iter()
                .position(|r| r.pattern == p)
                .unwrap()
        };
        assert!(pos("ChatGPT") < pos("GPT"));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let persona: PersonaConfig = serde_json::from_str(r#"{"name": "Otra"}"#).unwrap();
        assert_eq!(persona.name, "Otra");
        assert_eq!(persona.scripted_facts.len(), 11);
        assert_eq!(persona.min_reply_chars, 30);
    }
}
