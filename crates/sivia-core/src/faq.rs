use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

const BUILTIN: &[(&str, &str)] = &[
    (
        r"hola|buenos días|saludos",
        "Hola, soy SIVIA, ¿en qué puedo ayudarte?",
    ),
    (
        r"quien eres|qué eres",
        "Soy SIVIA, la asistente virtual de Manos Unidas. Estoy aquí para ayudarte con información sobre la organización.",
    ),
    (r"manos unidas", "Manos Unidas es una organización que trabaja para..."),
    (
        r"proyectos",
        "Tenemos varios proyectos activos. Puedes verlos en la sección de Proyectos.",
    ),
    (
        r"ayuda|ayudar",
        "Puedes ayudar de varias formas: voluntariado, donaciones o difundiendo nuestra labor.",
    ),
    (
        r"contacto|contactar",
        "Puedes contactarnos a través de nuestro formulario en la web o por email.",
    ),
    (r"ubicación|donde están", "Nuestra sede principal está en..."),
    (
        r"donación|donar",
        "Puedes hacer donaciones seguras a través de nuestra página web en la sección \"Colabora\".",
    ),
    (r"voluntario|voluntariado", "Para ser voluntario, necesitas..."),
    (r"gracias", "¡Gracias a ti! Estoy aquí para ayudarte."),
    (
        r"adios|chau|hasta luego",
        "¡Hasta pronto! Si necesitas más ayuda, no dudes en volver.",
    ),
];

pub const FAQ_FALLBACK: &str = "Lo siento, no entiendo tu pregunta. ¿Podrías reformularla?";

static BUILTIN_TABLE: LazyLock<FaqTable> = LazyLock::new(|| {
    FaqTable::from_pairs(BUILTIN).expect("builtin FAQ patterns are valid regexes")
});

#[derive(Debug)]
pub enum FaqError {
    Pattern { pattern: String, source: regex::Error },
}

impl fmt::Display for FaqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaqError::Pattern { pattern, source } => {
                write!(f, "invalid FAQ pattern '{pattern}': {source}")
            }
        }
    }
}

impl std::error::Error for FaqError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FaqError::Pattern { source, .. } => Some(source),
        }
    }
}

/// Ordered pattern → reply table. The first matching pattern wins.
#[derive(Clone, Debug)]
pub struct FaqTable {
    entries: Vec<(Regex, String)>,
}

impl FaqTable {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Result<Self, FaqError> {
        let entries = pairs
            .iter()
            .map(|(pattern, reply)| {
                Regex::new(pattern)
                    .map(|re| (re, reply.to_string()))
                    .map_err(|source| FaqError::Pattern {
                        pattern: pattern.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    pub fn builtin() -> &'static FaqTable {
        &BUILTIN_TABLE
    }

    /// Reply for the first pattern found in the lowercased input.
    pub fn lookup(&self, input: &str) -> Option<&str> {
        let lower = input.to_lowercase();
        self.entries
            .iter()
            .find(|(re, _)| re.is_match(&lower))
            .map(|(_, reply)| reply.as_str())
    }

    /// Like [`lookup`](Self::lookup) but falls back to a "please rephrase" reply.
    pub fn reply(&self, input: &str) -> &str {
        self.lookup(input).unwrap_or(FAQ_FALLBACK)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
