use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::MessageRole;

/// One chat turn. Assistant messages record which model tier produced them
/// so the conversation view can label degraded answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub text: String,
    pub timestamp: NaiveDateTime,
    /// Base64 image attached by the patient, if any.
    pub image: Option<String>,
    /// Tier label of the model that generated this message (assistant only).
    pub model_used: Option<String>,
}

impl ChatMessage {
    pub fn from_patient(text: &str, image: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: MessageRole::Patient,
            text: text.to_string(),
            timestamp: chrono::Local::now().naive_local(),
            image,
            model_used: None,
        }
    }

    pub fn from_assistant(text: &str, model_used: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: MessageRole::Solace,
            text: text.to_string(),
            timestamp: chrono::Local::now().naive_local(),
            image: None,
            model_used,
        }
    }
}

/// A named, time-ordered message sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub title: String,
    pub created_at: NaiveDateTime,
    pub messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(title: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            created_at: chrono::Local::now().naive_local(),
            messages: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patient_message_has_no_model_label() {
        let msg = ChatMessage::from_patient("hello", None);
        assert_eq!(msg.role, MessageRole::Patient);
        assert!(msg.model_used.is_none());
    }

    #[test]
    fn assistant_message_carries_source_tier() {
        let msg = ChatMessage::from_assistant("hi", Some("gemini-2.5-flash".into()));
        assert_eq!(msg.role, MessageRole::Solace);
        assert_eq!(msg.model_used.as_deref(), Some("gemini-2.5-flash"));
    }

    #[test]
    fn new_session_is_empty() {
        let session = ChatSession::new("New conversation");
        assert!(session.messages.is_empty());
        assert_eq!(session.title, "New conversation");
    }
}
