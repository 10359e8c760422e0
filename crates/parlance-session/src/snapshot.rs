use parlance_types::{ConnectionStatus, Message, SafetyPreset, ThreadSummary};
use uuid::Uuid;

/// Immutable view of the session, republished after every change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub current_thread_id: Uuid,
    pub messages: Vec<Message>,
    pub threads: Vec<ThreadSummary>,
    pub draft: String,
    pub is_sending: bool,
    pub can_manage_history: bool,
    pub has_api_key: bool,
    pub selected_model: String,
    pub available_models: Vec<String>,
    pub system_prompt: String,
    pub safety_preset: SafetyPreset,
    pub connection: ConnectionStatus,
    /// Why the last send failed
    pub error_message: Option<String>,
    /// Recovery that happened during the last send
    pub notice: Option<String>,
    /// History could not be loaded or saved
    pub history_warning: Option<String>,
}

impl SessionSnapshot {
    /// Text of the newest assistant message, if any
    pub fn last_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| !m.is_user())
            .map(|m| m.text.as_str())
    }
}
