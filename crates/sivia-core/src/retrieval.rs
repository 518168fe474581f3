//! Trusted-retrieval policy and result rendering.
//!
//! Everything here is pure: deciding whether a query may go to the web,
//! whether a host is trusted, how page paragraphs become an excerpt, and how
//! accepted sources are presented. The network half lives in the CLI crate.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_EXCERPT_CHARS, DEFAULT_MAX_RESULTS, DEFAULT_MIN_PARAGRAPH_CHARS, TITLE_CHARS,
};

pub const SOURCES_HEADER: &str = "🔍 **Fuentes confiables:**";
pub const EXCERPTS_HEADER: &str = "📝 **Extractos relevantes:**";
pub const TRUNCATION_MARKER: &str = "...";

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Limits and allow/deny lists for web augmentation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalPolicy {
    /// Lowercase phrases; a query must contain one to reach the network.
    pub triggers: Vec<String>,
    /// Host suffixes (`.org`). An entry ending in `.` (`.ac.`) must be
    /// followed by exactly one final label (`ox.ac.uk`, not `ac.evil.com`).
    pub trusted_suffixes: Vec<String>,
    /// Host fragments rejected even when a suffix matches.
    pub denied_domains: Vec<String>,
    pub max_results: usize,
    pub excerpt_chars: usize,
    pub min_paragraph_chars: usize,
    /// Search URL; `{query}` is replaced with the URL-encoded query.
    pub search_url: String,
    pub search_timeout_secs: u64,
    pub page_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        Self {
            triggers: owned(&[
                "buscar web",
                "busca en internet",
                "fuente",
                "investiga",
                "search the web",
                "source",
                "investigate",
            ]),
            trusted_suffixes: owned(&[".org", ".gob", ".ong", ".gov", ".edu", ".ac."]),
            denied_domains: owned(&["wikipedia.org"]),
            max_results: DEFAULT_MAX_RESULTS,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            min_paragraph_chars: DEFAULT_MIN_PARAGRAPH_CHARS,
            search_url: "https://html.duckduckgo.com/html/?q={query}".to_string(),
            search_timeout_secs: 10,
            page_timeout_secs: 7,
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

impl RetrievalPolicy {
    /// Gate: only explicit requests may trigger outbound traffic.
    pub fn is_triggered(&self, query: &str) -> bool {
        let lower = query.to_lowercase();
        self.triggers
            .iter()
            .any(|t| !t.is_empty() && lower.contains(&t.to_lowercase()))
    }

    pub fn is_denied_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.denied_domains
            .iter()
            .any(|d| !d.is_empty() && host.contains(&d.to_lowercase()))
    }

    /// Allow-list check on a bare host name (no scheme, no port).
    pub fn is_trusted_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_lowercase();
        if host.is_empty() || self.is_denied_host(&host) {
            return false;
        }
        self.trusted_suffixes.iter().any(|entry| {
            let entry = entry.to_lowercase();
            match entry.strip_suffix('.') {
                Some(inner) if !inner.is_empty() => host
                    .rsplit_once('.')
                    .is_some_and(|(rest, last)| !last.is_empty() && rest.ends_with(inner)),
                Some(_) => false,
                None => !entry.is_empty() && host.ends_with(&entry),
            }
        })
    }

    /// Concatenate substantial paragraphs and cap the result.
    /// Returns `None` when no paragraph passes the length threshold.
    pub fn excerpt_from_paragraphs<'p, I>(&self, paragraphs: I) -> Option<String>
    where
        I: IntoIterator<Item = &'p str>,
    {
        let kept: Vec<&str> = paragraphs
            .into_iter()
            .map(str::trim)
            .filter(|p| p.chars().count() > self.min_paragraph_chars)
            .collect();
        if kept.is_empty() {
            return None;
        }
        Some(truncate_chars(&kept.join(" "), self.excerpt_chars))
    }
}

/// Cut to `limit` characters, appending the marker only when text was dropped.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => format!("{}{TRUNCATION_MARKER}", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Anchor text as shown in the sources block.
pub fn clean_title(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(TITLE_CHARS).collect::<String>().trim().to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedSource {
    pub title: String,
    pub url: String,
    /// `None` when the page could not be fetched or had no usable text.
    pub excerpt: Option<String>,
}

/// Accepted sources for one turn, in search ranking order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalResult {
    sources: Vec<RetrievedSource>,
}

impl RetrievalResult {
    /// `None` for an empty list: a retrieval with no sources is no retrieval.
    pub fn new(sources: Vec<RetrievedSource>) -> Option<Self> {
        if sources.is_empty() {
            None
        } else {
            Some(Self { sources })
        }
    }

    pub fn sources(&self) -> &[RetrievedSource] {
        &self.sources
    }

    pub fn sources_block(&self) -> String {
        let lines: Vec<String> = self
            .sources
            .iter()
            .map(|s| format!("- {}\n  {}", s.title, s.url))
            .collect();
        format!("{SOURCES_HEADER}\n{}", lines.join("\n"))
    }

    pub fn excerpts_block(&self) -> Option<String> {
        let excerpts: Vec<String> = self
            .sources
            .iter()
            .filter_map(|s| s.excerpt.as_ref().map(|e| format!("{}: {e}", s.title)))
            .collect();
        if excerpts.is_empty() {
            None
        } else {
            Some(format!("{EXCERPTS_HEADER}\n{}", excerpts.join("\n\n")))
        }
    }

    /// Sources followed by excerpts; this is what the prompt receives.
    pub fn context_text(&self) -> String {
        match self.excerpts_block() {
            Some(excerpts) => format!("{}\n\n{excerpts}", self.sources_block()),
            None => self.sources_block(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn source(title: &str, url: &str, excerpt: Option<&str>) -> RetrievedSource {
        RetrievedSource {
            title: title.to_string(),
            url: url.to_string(),
            excerpt: excerpt.map(str::to_string),
        }
    }

    #[test]
    fn test_trigger_phrases() {
        let p = RetrievalPolicy::default();
        assert!(p.is_triggered("Buscar web sobre energía solar"));
        assert!(p.is_triggered("dame una FUENTE"));
        assert!(p.is_triggered("please search the web for bees"));
        assert!(!p.is_triggered("hola, ¿cómo estás?"));
    }

    #[test]
    fn test_trusted_suffixes() {
        let p = RetrievalPolicy::default();
        assert!(p.is_trusted_host("www.unicef.org"));
        assert!(p.is_trusted_host("argentina.gob"));
        assert!(p.is_trusted_host("nasa.gov"));
        assert!(p.is_trusted_host("mit.edu"));
        assert!(p.is_trusted_host("www.ox.ac.uk"));
        assert!(p.is_trusted_host("www.u-tokyo.ac.jp"));
        assert!(!p.is_trusted_host("login.ac.scam-site.com"));
        assert!(!p.is_trusted_host("www.ac.example.net"));
        assert!(!p.is_trusted_host("ac.uk"));
        assert!(p.is_trusted_host("WWW.UNICEF.ORG"));
        assert!(!p.is_trusted_host("example.com"));
        assert!(!p.is_trusted_host("organic.com"));
        assert!(!p.is_trusted_host(""));
    }

    #[test]
    fn test_encyclopedia_denied() {
        let p = RetrievalPolicy::default();
        assert!(!p.is_trusted_host("es.wikipedia.org"));
        assert!(!p.is_trusted_host("wikipedia.org"));
    }

    #[test]
    fn test_excerpt_skips_short_paragraphs() {
        let p = RetrievalPolicy::default();
        let long = "La energía solar es la energía obtenida a partir de la radiación del sol.";
        let excerpt = p
            .excerpt_from_paragraphs(["Inicio", "Menú", long, "  "])
            .unwrap();
        assert_eq!(excerpt, long);
    }

    #[test]
    fn test_excerpt_none_when_all_short() {
        let p = RetrievalPolicy::default();
        assert!(p.excerpt_from_paragraphs(["Inicio", "Contacto"]).is_none());
    }

    #[test]
    fn test_excerpt_capped_with_marker() {
        let p = RetrievalPolicy {
            excerpt_chars: 10,
            min_paragraph_chars: 0,
            ..Default::default()
        };
        let excerpt = p.excerpt_from_paragraphs(["áéíóúáéíóúáéíóú"]).unwrap();
        assert_eq!(excerpt, "áéíóúáéíóú...");
    }

    #[test]
    fn test_truncate_exact_length_has_no_marker() {
        assert_eq!(truncate_chars("abcde", 5), "abcde");
        assert_eq!(truncate_chars("abcdef", 5), "abcde...");
    }

    #[test]
    fn test_clean_title() {
        let raw = format!("  Energía\n   solar {}", "x".repeat(200));
        let title = clean_title(&raw);
        assert!(title.starts_with("Energía solar"));
        assert_eq!(title.chars().count(), 80);
    }

    #[test]
    fn test_empty_result_is_none() {
        assert!(RetrievalResult::new(Vec::new()).is_none());
    }

    #[test]
    fn test_sources_only_rendering() {
        let r = RetrievalResult::new(vec![source("UNICEF", "https://unicef.org/a", None)]).unwrap();
        assert_eq!(
            r.sources_block(),
            "🔍 **Fuentes confiables:**\n- UNICEF\n  https://unicef.org/a"
        );
        assert!(r.excerpts_block().is_none());
        assert_eq!(r.context_text(), r.sources_block());
    }

    #[test]
    fn test_excerpts_rendering_keeps_failed_fetch_source() {
        let r = RetrievalResult::new(vec![
            source("A", "https://a.org", Some("texto a")),
            source("B", "https://b.gov", None),
        ])
        .unwrap();
        let context = r.context_text();
        assert!(context.contains("- B\n  https://b.gov"));
        assert!(context.contains("📝 **Extractos relevantes:**\nA: texto a"));
        assert!(!context.contains("B: "));
    }

    proptest! {
        #[test]
        fn prop_gate_requires_trigger(query in "[a-zA-Z0-9 ¿?áéíóúñ]{0,60}") {
            let p = RetrievalPolicy::default();
            let lower = query.to_lowercase();
            let has_trigger = p.triggers.iter().any(|t| lower.contains(t.as_str()));
            prop_assert_eq!(p.is_triggered(&query), has_trigger);
        }

        #[test]
        fn prop_trusted_hosts_obey_lists(
            labels in prop::collection::vec(
                prop::sample::select(vec![
                    "www", "ac", "org", "gov", "edu", "gob", "ong", "com", "net",
                    "uk", "wikipedia", "login", "x-1", "scam-site",
                ]),
                1..6,
            ),
        ) {
            let p = RetrievalPolicy::default();
            let host = labels.join(".");
            let suffix_ok = [".org", ".gob", ".ong", ".gov", ".edu"]
                .iter()
                .any(|s| host.ends_with(s));
            let academic = host
                .rsplit_once('.')
                .is_some_and(|(rest, _)| rest.ends_with(".ac"));
            let allowed = (suffix_ok || academic) && !host.contains("wikipedia.org");
            prop_assert_eq!(p.is_trusted_host(&host), allowed, "{}", host);
        }
    }
}
