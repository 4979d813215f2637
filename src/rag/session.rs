//! In-memory conversation sessions.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    fn label(self) -> &'static str {
        match self {
            Speaker::User => "User",
            Speaker::Assistant => "Assistant",
        }
    }
}

#[derive(Debug, Clone)]
struct Turn {
    speaker: Speaker,
    content: String,
}

#[derive(Debug, Default)]
struct Session {
    turns: Vec<Turn>,
    last_used: u64,
}

#[derive(Debug, Default)]
struct SessionMap {
    tick: u64,
    by_id: HashMap<String, Session>,
}

impl SessionMap {
    /// Session for `id`, created if missing and marked as most recently used.
    /// Evicts the least recently used session once over `max_sessions`.
    fn touch(&mut self, id: &str, max_sessions: usize) -> &mut Session {
        self.tick += 1;
        let tick = self.tick;

        if !self.by_id.contains_key(id) && self.by_id.len() >= max_sessions {
            let oldest = self
                .by_id
                .iter()
                .min_by_key(|(_, session)| session.last_used)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                debug!("Evicting idle session {}", oldest);
                self.by_id.remove(&oldest);
            }
        }

        let session = self.by_id.entry(id.to_string()).or_default();
        session.last_used = tick;
        session
    }
}

/// Sessions kept by default before the least recently used is evicted.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// Per-session history of question/answer exchanges.
///
/// Each session keeps at most `max_history` exchanges; older ones are
/// dropped first. At most `max_sessions` sessions are held, and starting
/// one more evicts the session written to least recently.
#[derive(Debug)]
pub struct SessionManager {
    max_history: usize,
    max_sessions: usize,
    sessions: RwLock<SessionMap>,
}

impl SessionManager {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            max_sessions: DEFAULT_MAX_SESSIONS,
            sessions: RwLock::new(SessionMap::default()),
        }
    }

    /// Set the session cap. Zero is treated as one.
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    /// Start a new empty session and return its id.
    pub fn create_session(&self) -> String {
        let id = format!("session_{}", Uuid::new_v4().simple());
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .touch(&id, self.max_sessions);
        debug!("Created session {}", id);
        id
    }

    /// Record one exchange. Unknown ids start a new session.
    pub fn add_exchange(&self, session_id: &str, user_message: &str, assistant_message: &str) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let turns = &mut sessions.touch(session_id, self.max_sessions).turns;

        turns.push(Turn {
            speaker: Speaker::User,
            content: user_message.to_string(),
        });
        turns.push(Turn {
            speaker: Speaker::Assistant,
            content: assistant_message.to_string(),
        });

        let keep = self.max_history * 2;
        if turns.len() > keep {
            let excess = turns.len() - keep;
            turns.drain(..excess);
        }
    }

    /// History rendered as `Role: content` lines, or `None` if there is none.
    pub fn get_conversation_history(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        let turns = sessions
            .by_id
            .get(session_id)
            .map(|s| &s.turns)
            .filter(|t| !t.is_empty())?;

        Some(
            turns
                .iter()
                .map(|t| format!("{}: {}", t.speaker.label(), t.content))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    /// Forget a session's history. Returns whether the session existed.
    pub fn clear_session(&self, session_id: &str) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .remove(session_id)
            .is_some();
        debug!("Cleared session {} (existed: {})", session_id, removed);
        removed
    }

    pub fn session_count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .len()
    }
}
