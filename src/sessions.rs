//! Chat session collection.
//!
//! Sessions are independently addressable; exactly one is current at a
//! time, and the collection is never empty — deleting the last session
//! immediately creates a fresh one so the chat surface always has
//! somewhere to append.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ChatMessage, ChatSession};

const DEFAULT_TITLE: &str = "New conversation";

/// Maximum generated-title length in characters.
const TITLE_MAX_CHARS: usize = 50;

/// The full set of chat sessions plus the current-session pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBook {
    sessions: Vec<ChatSession>,
    current: Uuid,
}

impl SessionBook {
    pub fn new() -> Self {
        let first = ChatSession::new(DEFAULT_TITLE);
        let current = first.id;
        Self {
            sessions: vec![first],
            current,
        }
    }

    /// Restore from persisted state, repairing the two invariants: at least
    /// one session exists, and `current` addresses one of them.
    pub fn restore(mut sessions: Vec<ChatSession>, current: Uuid) -> Self {
        if sessions.is_empty() {
            sessions.push(ChatSession::new(DEFAULT_TITLE));
        }
        let current = if sessions.iter().any(|s| s.id == current) {
            current
        } else {
            sessions[0].id
        };
        Self { sessions, current }
    }

    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn current_id(&self) -> Uuid {
        self.current
    }

    pub fn current(&self) -> &ChatSession {
        // The invariants guarantee the pointer resolves
        self.sessions
            .iter()
            .find(|s| s.id == self.current)
            .unwrap_or(&self.sessions[0])
    }

    pub fn current_mut(&mut self) -> &mut ChatSession {
        let idx = self
            .sessions
            .iter()
            .position(|s| s.id == self.current)
            .unwrap_or(0);
        &mut self.sessions[idx]
    }

    /// Create a session and make it current.
    pub fn create(&mut self, title: &str) -> Uuid {
        let session = ChatSession::new(if title.trim().is_empty() {
            DEFAULT_TITLE
        } else {
            title
        });
        let id = session.id;
        self.sessions.push(session);
        self.current = id;
        id
    }

    /// Switch the current pointer. Unknown ids are ignored.
    pub fn switch(&mut self, id: Uuid) -> bool {
        if self.sessions.iter().any(|s| s.id == id) {
            self.current = id;
            true
        } else {
            false
        }
    }

    /// Delete a session. Deleting the last one auto-creates a replacement;
    /// deleting the current one repoints `current` at the most recent
    /// survivor.
    pub fn delete(&mut self, id: Uuid) {
        self.sessions.retain(|s| s.id != id);
        if self.sessions.is_empty() {
            let fresh = ChatSession::new(DEFAULT_TITLE);
            self.current = fresh.id;
            self.sessions.push(fresh);
        } else if self.current == id {
            self.current = self.sessions[self.sessions.len() - 1].id;
        }
    }

    pub fn rename(&mut self, id: Uuid, title: &str) {
        if let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) {
            session.title = title.to_string();
        }
    }

    /// Append a message to the current session. The first patient message
    /// of a default-titled session also titles it.
    pub fn append(&mut self, message: ChatMessage) {
        let session = self.current_mut();
        if session.title == DEFAULT_TITLE && session.messages.is_empty() {
            let generated = generate_title(&message.text);
            if generated != DEFAULT_TITLE {
                session.title = generated;
            }
        }
        session.messages.push(message);
    }
}

impl Default for SessionBook {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a session title from the first patient message.
/// Truncates at 50 characters with "..." if longer, handling UTF-8 correctly.
pub fn generate_title(first_message: &str) -> String {
    let trimmed = first_message.trim();
    if trimmed.is_empty() {
        return DEFAULT_TITLE.to_string();
    }

    let truncated: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
    if truncated.chars().count() < trimmed.chars().count() {
        format!("{truncated}...")
    } else {
        truncated
    }
}
