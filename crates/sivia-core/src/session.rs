//! Bounded per-session transcripts.
//!
//! The outer map lock is held only long enough to find or create a session's
//! history; appends and trims lock that one history, so different session ids
//! never contend on a write.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::time::now_iso8601;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub author: Author,
    pub text: String,
    pub timestamp: String,
}

impl ConversationTurn {
    pub fn new(author: Author, text: &str) -> Self {
        Self {
            author,
            text: text.to_string(),
            timestamp: now_iso8601(),
        }
    }

    pub fn user(text: &str) -> Self {
        Self::new(Author::User, text)
    }

    pub fn assistant(text: &str) -> Self {
        Self::new(Author::Assistant, text)
    }
}

/// One session's turns, oldest first, never longer than `window`.
#[derive(Debug)]
pub struct SessionHistory {
    turns: VecDeque<ConversationTurn>,
    window: usize,
}

impl SessionHistory {
    fn new(window: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(window),
            window,
        }
    }

    fn push(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.window {
            self.turns.pop_front();
        }
    }

    fn tail(&self, k: usize) -> Vec<ConversationTurn> {
        let skip = self.turns.len().saturating_sub(k);
        self.turns.iter().skip(skip).cloned().collect()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-wide session registry, shared behind an `Arc`.
#[derive(Debug)]
pub struct SessionStore {
    window: usize,
    sessions: Mutex<HashMap<String, Arc<Mutex<SessionHistory>>>>,
}

impl SessionStore {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    fn history(&self, session_id: &str) -> Arc<Mutex<SessionHistory>> {
        let mut sessions = lock(&self.sessions);
        Arc::clone(
            sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(SessionHistory::new(self.window)))),
        )
    }

    /// Append a turn, evicting the oldest ones beyond the window.
    pub fn append(&self, session_id: &str, turn: ConversationTurn) {
        let history = self.history(session_id);
        lock(&history).push(turn);
    }

    /// Up to `k` most recent turns, oldest first.
    pub fn recent(&self, session_id: &str, k: usize) -> Vec<ConversationTurn> {
        let history = self.history(session_id);
        let guard = lock(&history);
        guard.tail(k)
    }

    pub fn len(&self, session_id: &str) -> usize {
        let history = self.history(session_id);
        let guard = lock(&history);
        guard.turns.len()
    }

    pub fn session_count(&self) -> usize {
        lock(&self.sessions).len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_HISTORY_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread;

    #[test]
    fn test_unknown_session_created_empty() {
        let store = SessionStore::new(10);
        assert!(store.recent("nuevo", 10).is_empty());
        assert_eq!(store.session_count(), 1);
    }

    #[test]
    fn test_fifo_eviction() {
        let store = SessionStore::new(3);
        for i in 0..5 {
            store.append("s", ConversationTurn::user(&format!("m{i}")));
        }
        let texts: Vec<String> = store.recent("s", 10).into_iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn test_recent_k_smaller_than_history() {
        let store = SessionStore::new(10);
        for i in 0..6 {
            store.append("s", ConversationTurn::assistant(&format!("m{i}")));
        }
        let texts: Vec<String> = store.recent("s", 2).into_iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["m4", "m5"]);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new(10);
        store.append("a", ConversationTurn::user("hola"));
        store.append("b", ConversationTurn::user("chau"));
        assert_eq!(store.recent("a", 10)[0].text, "hola");
        assert_eq!(store.recent("b", 10)[0].text, "chau");
        assert_eq!(store.session_count(), 2);
    }

    #[test]
    fn test_zero_window_clamped() {
        let store = SessionStore::new(0);
        store.append("s", ConversationTurn::user("a"));
        store.append("s", ConversationTurn::user("b"));
        assert_eq!(store.len("s"), 1);
    }

    #[test]
    fn test_concurrent_appends_stay_bounded() {
        let store = Arc::new(SessionStore::new(10));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..50 {
                        store.append("shared", ConversationTurn::user(&format!("{t}-{i}")));
                        store.append(&format!("own-{t}"), ConversationTurn::user("x"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len("shared"), 10);
        assert_eq!(store.len("own-3"), 10);
        assert_eq!(store.session_count(), 9);
    }

    #[test]
    fn test_turn_serializes_lowercase_author() {
        let json = serde_json::to_value(ConversationTurn::user("hola")).unwrap();
        assert_eq!(json["author"], "user");
        assert_eq!(json["text"], "hola");
    }

    proptest! {
        #[test]
        fn prop_recent_is_last_k_in_order(window in 1usize..20, n in 0usize..60, k in 0usize..30) {
            let store = SessionStore::new(window);
            for i in 0..n {
                store.append("s", ConversationTurn::user(&i.to_string()));
            }
            let got: Vec<usize> = store
                .recent("s", k)
                .iter()
                .map(|t| t.text.parse().unwrap())
                .collect();
            let expected_len = n.min(window).min(k);
            prop_assert_eq!(got.len(), expected_len);
            let expected: Vec<usize> = (n - expected_len..n).collect();
            prop_assert_eq!(got, expected);
            prop_assert!(store.len("s") <= window);
        }
    }
}
