use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Message;

pub const NEW_CHAT_TITLE: &str = "New Chat";
pub const EMPTY_PREVIEW: &str = "No messages yet";
pub const TITLE_MAX_CHARS: usize = 48;
pub const PREVIEW_MAX_CHARS: usize = 90;

/// A persisted conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: NEW_CHAT_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Replace the message list, re-deriving the title and bumping `updated_at`
    pub fn set_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.title = derive_title(&self.messages);
        self.updated_at = Utc::now();
    }

    pub fn summary(&self) -> ThreadSummary {
        ThreadSummary {
            id: self.id,
            title: self.title.clone(),
            preview: derive_preview(&self.messages),
            updated_at: self.updated_at,
        }
    }
}

impl Default for Thread {
    fn default() -> Self {
        Self::new()
    }
}

/// Sidebar row for a thread; derived, never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    pub id: Uuid,
    pub title: String,
    pub preview: String,
    pub updated_at: DateTime<Utc>,
}

/// First user message, whitespace-normalised and truncated, or "New Chat"
pub fn derive_title(messages: &[Message]) -> String {
    messages
        .iter()
        .filter(|m| m.is_user())
        .map(|m| normalize_whitespace(&m.text))
        .find(|t| !t.is_empty())
        .map(|t| truncate_chars(&t, TITLE_MAX_CHARS))
        .unwrap_or_else(|| NEW_CHAT_TITLE.to_string())
}

/// Last non-empty message, whitespace-normalised and truncated
pub fn derive_preview(messages: &[Message]) -> String {
    messages
        .iter()
        .rev()
        .map(|m| normalize_whitespace(&m.text))
        .find(|t| !t.is_empty())
        .map(|t| truncate_chars(&t, PREVIEW_MAX_CHARS))
        .unwrap_or_else(|| EMPTY_PREVIEW.to_string())
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut to at most `max` characters, the last one being `…` when cut
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}
