//! Persona sanitization: strip vendor and model identity from raw model text.
//!
//! Rules run in list order over one buffer. Each rule replaces its pattern
//! verbatim, then all-lowercase, then all-uppercase. Because later rules see
//! the output of earlier ones, ordering is part of the behavior: a longer
//! brand term has to come before any shorter term it contains.

use serde::{Deserialize, Serialize};

/// One literal `pattern -> replacement` substitution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementRule {
    pub pattern: String,
    pub replacement: String,
}

impl ReplacementRule {
    pub fn new(pattern: &str, replacement: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
        }
    }

    /// The three letter-case variants, in application order.
    fn variants(&self) -> [String; 3] {
        [
            self.pattern.clone(),
            self.pattern.to_lowercase(),
            self.pattern.to_uppercase(),
        ]
    }

    fn apply(&self, buffer: String) -> String {
        self.variants().iter().fold(buffer, |acc, variant| {
            if variant.is_empty() {
                acc
            } else {
                acc.replace(variant.as_str(), &self.replacement)
            }
        })
    }
}

/// Ordered rule list. Pure, no state between calls.
#[derive(Clone, Debug)]
pub struct Sanitizer {
    rules: Vec<ReplacementRule>,
}

impl Sanitizer {
    pub fn new(rules: Vec<ReplacementRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ReplacementRule] {
        &self.rules
    }

    pub fn sanitize(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |buffer, rule| rule.apply(buffer))
    }

    /// True if any rule variant still occurs in `text`.
    pub fn contains_banned(&self, text: &str) -> bool {
        self.rules.iter().any(|rule| {
            rule.variants()
                .iter()
                .any(|v| !v.is_empty() && text.contains(v.as_str()))
        })
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(crate::persona::PersonaConfig::default().replacements)
    }
}
