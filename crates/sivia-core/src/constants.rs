/// Turns kept per session before the oldest are evicted
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Accepted search results fetched per retrieval
pub const DEFAULT_MAX_RESULTS: usize = 2;

/// Excerpt cap, in characters, before the truncation marker
pub const DEFAULT_EXCERPT_CHARS: usize = 500;

/// Paragraphs at or below this many characters are navigation noise
pub const DEFAULT_MIN_PARAGRAPH_CHARS: usize = 40;

/// Search-result titles are cut to this many characters
pub const TITLE_CHARS: usize = 80;

/// Replies shorter than this (trimmed) are followed by suggestions
pub const MIN_REPLY_CHARS: usize = 30;

/// Messages (user + model) a persistent chat keeps for context
pub const DEFAULT_CHAT_HISTORY_LIMIT: usize = 20;

pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_MODEL: &str = "models/gemini-2.5-flash";

pub const DEFAULT_MODEL_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_HOST: &str = "127.0.0.1";

pub const DEFAULT_PORT: u16 = 8000;
