//! Terminal rendering of session snapshots

use parlance_session::SessionSnapshot;
use parlance_types::{ConnectionStatus, Message, ThreadSummary};
use std::fmt::Write;
use uuid::Uuid;

/// Turns successive renderings of one reply into terminal output.
///
/// Growth is printed as a suffix. If a rendering is not an extension of
/// what was printed (the animator cut back to a shorter prefix), the reply
/// is reprinted on a fresh line.
#[derive(Debug, Default)]
pub struct ReplyPrinter {
    printed: String,
}

impl ReplyPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text to write so the terminal shows `text`
    pub fn update(&mut self, text: &str) -> String {
        let out = match text.strip_prefix(self.printed.as_str()) {
            Some(suffix) => suffix.to_string(),
            None => format!("\n{text}"),
        };
        self.printed = text.to_string();
        out
    }

    pub fn printed(&self) -> &str {
        &self.printed
    }
}

/// The assistant message being written, if the newest message is one
pub fn reply_in_progress(snapshot: &SessionSnapshot) -> Option<&str> {
    snapshot
        .messages
        .last()
        .filter(|m| !m.is_user())
        .map(|m| m.text.as_str())
}

pub fn format_transcript(messages: &[Message]) -> String {
    let mut out = String::new();
    for message in messages {
        let speaker = if message.is_user() { "You" } else { "Gemini" };
        let _ = writeln!(out, "{speaker}: {}", message.text);
    }
    out
}

/// Id of the `n`th chat (1-based) as `/list` shows them
pub fn thread_at(snapshot: &SessionSnapshot, n: usize) -> Option<Uuid> {
    snapshot.threads.get(n.checked_sub(1)?).map(|t| t.id)
}

pub fn format_thread_list(threads: &[ThreadSummary], current: Uuid) -> String {
    let mut out = String::new();
    for (i, thread) in threads.iter().enumerate() {
        let marker = if thread.id == current { '*' } else { ' ' };
        let _ = writeln!(
            out,
            "{marker} {:>2}. {}  ({})  {}",
            i + 1,
            thread.title,
            thread.updated_at.format("%Y-%m-%d %H:%M"),
            thread.preview
        );
    }
    out
}

pub fn format_status(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();
    let connection = match (&snapshot.connection, snapshot.has_api_key) {
        (ConnectionStatus::NotConfigured, _) | (_, false) => {
            "no API key (set one with /key)".to_string()
        }
        (status, true) => status.to_string(),
    };
    let _ = writeln!(out, "Connection:    {connection}");
    let _ = writeln!(out, "Model:         {}", snapshot.selected_model);
    let _ = writeln!(out, "Safety:        {}", snapshot.safety_preset);
    let prompt = if snapshot.system_prompt.trim().is_empty() {
        "(none)"
    } else {
        snapshot.system_prompt.as_str()
    };
    let _ = writeln!(out, "System prompt: {prompt}");
    let _ = writeln!(out, "Chats:         {}", snapshot.threads.len());
    if let Some(warning) = &snapshot.history_warning {
        let _ = writeln!(out, "Warning:       {warning}");
    }
    out
}

pub fn format_models(snapshot: &SessionSnapshot) -> String {
    if snapshot.available_models.is_empty() {
        return "No models listed yet.\n".to_string();
    }
    let mut out = String::new();
    for model in &snapshot.available_models {
        let marker = if *model == snapshot.selected_model { '*' } else { ' ' };
        let _ = writeln!(out, "{marker} {model}");
    }
    out
}
