//! Trusted retriever: gated web search, allow-list filtering and concurrent
//! excerpt extraction.
//!
//! Never fails outward. Every network or parse problem is logged and the turn
//! proceeds without web context.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use scraper::{Html, Selector};
use sivia_core::retrieval::clean_title;
use sivia_core::{RetrievalPolicy, RetrievalResult, RetrievedSource};
use url::Url;

const DUCKDUCKGO_BASE: &str = "https://duckduckgo.com/";

static RESULT_ITEMS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.result__a, div.g").unwrap());
static LINKS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static PARAGRAPHS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());

#[derive(Debug)]
pub enum RetrieveError {
    Client(String),
    Transport(String),
    Status(u16),
}

impl fmt::Display for RetrieveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrieveError::Client(msg) => write!(f, "HTTP client setup failed: {msg}"),
            RetrieveError::Transport(msg) => write!(f, "request failed: {msg}"),
            RetrieveError::Status(code) => write!(f, "HTTP {code}"),
        }
    }
}

impl std::error::Error for RetrieveError {}

/// A ranked search result before filtering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, RetrieveError>;
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Trimmed text of every `<p>` on the page, in document order.
    async fn paragraphs(&self, url: &str) -> Result<Vec<String>, RetrieveError>;
}

// ---------------------------------------------------------------------------
// HTML parsing (pure)
// ---------------------------------------------------------------------------

/// Resolve a result href to its real target.
///
/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<target>` and Google
/// as `/url?q=<target>`. Anything that does not end up `http(s)` is dropped.
pub fn resolve_result_href(href: &str) -> Option<String> {
    let base = Url::parse(DUCKDUCKGO_BASE).ok()?;
    let url = base.join(href.trim()).ok()?;
    let redirect_param = match url.path() {
        "/l/" | "/l" => Some("uddg"),
        "/url" => Some("q"),
        _ => None,
    };
    let target = match redirect_param {
        Some(param) => {
            let (_, value) = url.query_pairs().find(|(k, _)| k == param)?;
            Url::parse(&value).ok()?
        }
        None => url,
    };
    matches!(target.scheme(), "http" | "https").then(|| target.to_string())
}

pub fn parse_search_results(html: &str) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    document
        .select(&RESULT_ITEMS)
        .filter_map(|item| {
            // A Google result block counts once, by its first link.
            let anchor = if item.value().name() == "a" {
                item
            } else {
                item.select(&LINKS).next()?
            };
            let href = anchor.value().attr("href")?;
            let url = resolve_result_href(href)?;
            let title = clean_title(&anchor.text().collect::<String>());
            Some(SearchHit { title, url })
        })
        .collect()
}

pub fn extract_paragraphs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&PARAGRAPHS)
        .map(|p| p.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_lowercase)
}

// ---------------------------------------------------------------------------
// HTTP implementations
// ---------------------------------------------------------------------------

fn http_client(timeout_secs: u64, user_agent: &str) -> Result<reqwest::Client, RetrieveError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| RetrieveError::Client(e.to_string()))
}

async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, RetrieveError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| RetrieveError::Transport(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(RetrieveError::Status(status.as_u16()));
    }
    response
        .text()
        .await
        .map_err(|e| RetrieveError::Transport(e.to_string()))
}

pub struct HttpSearch {
    client: reqwest::Client,
    url_template: String,
}

impl HttpSearch {
    pub fn new(policy: &RetrievalPolicy) -> Result<Self, RetrieveError> {
        Ok(Self {
            client: http_client(policy.search_timeout_secs, &policy.user_agent)?,
            url_template: policy.search_url.clone(),
        })
    }

    fn search_url(&self, query: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        self.url_template.replace("{query}", &encoded)
    }
}

#[async_trait]
impl SearchBackend for HttpSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, RetrieveError> {
        let html = get_text(&self.client, &self.search_url(query)).await?;
        Ok(parse_search_results(&html))
    }
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(policy: &RetrievalPolicy) -> Result<Self, RetrieveError> {
        Ok(Self {
            client: http_client(policy.page_timeout_secs, &policy.user_agent)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn paragraphs(&self, url: &str) -> Result<Vec<String>, RetrieveError> {
        let html = get_text(&self.client, url).await?;
        Ok(extract_paragraphs(&html))
    }
}

// ---------------------------------------------------------------------------
// Retriever
// ---------------------------------------------------------------------------

pub struct TrustedRetriever {
    policy: RetrievalPolicy,
    search: Arc<dyn SearchBackend>,
    fetcher: Arc<dyn PageFetcher>,
}

impl TrustedRetriever {
    pub fn new(
        policy: RetrievalPolicy,
        search: Arc<dyn SearchBackend>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        Self {
            policy,
            search,
            fetcher,
        }
    }

    /// Retriever backed by real HTTP search and page fetches.
    pub fn http(policy: RetrievalPolicy) -> Result<Self, RetrieveError> {
        let search = Arc::new(HttpSearch::new(&policy)?);
        let fetcher = Arc::new(HttpFetcher::new(&policy)?);
        Ok(Self::new(policy, search, fetcher))
    }

    /// Ranked hits on trusted hosts, deduplicated, capped at `max_results`.
    fn accept(&self, hits: Vec<SearchHit>) -> Vec<SearchHit> {
        let mut seen = HashSet::new();
        hits.into_iter()
            .filter(|hit| {
                host_of(&hit.url).is_some_and(|host| self.policy.is_trusted_host(&host))
            })
            .filter(|hit| seen.insert(hit.url.clone()))
            .take(self.policy.max_results)
            .collect()
    }

    pub async fn retrieve(&self, query: &str) -> Option<RetrievalResult> {
        if !self.policy.is_triggered(query) {
            return None;
        }

        let hits = match self.search.search(query).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("web search failed: {e}");
                return None;
            }
        };
        let total = hits.len();
        let accepted = self.accept(hits);
        tracing::debug!(total, accepted = accepted.len(), "search results filtered");
        if accepted.is_empty() {
            return None;
        }

        let pages = join_all(accepted.iter().map(|hit| self.fetcher.paragraphs(&hit.url))).await;

        let sources = accepted
            .into_iter()
            .zip(pages)
            .map(|(hit, page)| {
                let excerpt = match page {
                    Ok(paragraphs) => self
                        .policy
                        .excerpt_from_paragraphs(paragraphs.iter().map(String::as_str)),
                    Err(e) => {
                        tracing::warn!(url = %hit.url, "page fetch failed: {e}");
                        None
                    }
                };
                RetrievedSource {
                    title: hit.title,
                    url: hit.url,
                    excerpt,
                }
            })
            .collect();
        RetrievalResult::new(sources)
    }
}
