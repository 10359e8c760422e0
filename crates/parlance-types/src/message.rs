use chrono::{DateTime, Utc};
use parlance_llm::Content;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One chat message; assistant text grows in place while a reply streams
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            text: text.into(),
            model_name: None,
            created_at: Utc::now(),
        }
    }

    /// Empty assistant message shown before the first token arrives
    pub fn assistant_placeholder(model_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            text: String::new(),
            model_name: Some(model_name.into()),
            created_at: Utc::now(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// No visible text yet
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl From<&Message> for Content {
    fn from(message: &Message) -> Self {
        match message.role {
            Role::User => Content::user(message.text.clone()),
            Role::Assistant => Content::model(message.text.clone()),
        }
    }
}

/// Conversation history as request contents, skipping blank messages
pub fn to_contents(messages: &[Message]) -> Vec<Content> {
    messages
        .iter()
        .filter(|m| !m.is_blank())
        .map(Content::from)
        .collect()
}
