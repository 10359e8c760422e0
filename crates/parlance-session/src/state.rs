use parlance_persist::dedupe_empty_threads;
use parlance_types::{Message, Thread, ThreadSummary};
use uuid::Uuid;

use crate::error::{Result, SessionError};

/// Chat history owned by the session: every thread plus a working copy of
/// the open thread's messages.
///
/// The working copy is written back into its thread on every mutation, so
/// `threads` is always current when it is persisted.
#[derive(Debug, Clone)]
pub struct SessionState {
    threads: Vec<Thread>,
    current_thread_id: Uuid,
    messages: Vec<Message>,
    draft: String,
    is_sending: bool,
    dirty: bool,
}

impl SessionState {
    /// Open the most recently updated thread, creating one if there are none
    pub fn new(mut threads: Vec<Thread>) -> Self {
        if threads.is_empty() {
            threads.push(Thread::new());
        }

        let current = threads
            .iter()
            .max_by_key(|t| t.updated_at)
            .map(|t| (t.id, t.messages.clone()));
        let (current_thread_id, messages) = match current {
            Some(found) => found,
            None => (threads[0].id, Vec::new()),
        };

        Self {
            threads,
            current_thread_id,
            messages,
            draft: String::new(),
            is_sending: false,
            dirty: false,
        }
    }

    pub fn current_thread_id(&self) -> Uuid {
        self.current_thread_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    /// Hand out the trimmed draft and clear it; `None` if it is blank
    pub fn take_draft(&mut self) -> Option<String> {
        let text = self.draft.trim().to_string();
        if text.is_empty() {
            return None;
        }
        self.draft.clear();
        Some(text)
    }

    pub fn is_sending(&self) -> bool {
        self.is_sending
    }

    pub fn set_sending(&mut self, sending: bool) {
        self.is_sending = sending;
    }

    pub fn can_manage_history(&self) -> bool {
        !self.is_sending
    }

    /// Unpersisted changes exist
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn ensure_can_manage(&self) -> Result<()> {
        if self.is_sending {
            return Err(SessionError::HistoryLocked);
        }
        Ok(())
    }

    /// Threads for the sidebar, most recently updated first
    pub fn summaries(&self) -> Vec<ThreadSummary> {
        let mut summaries: Vec<ThreadSummary> = self.threads.iter().map(Thread::summary).collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries
    }

    /// Write the working copy back into its thread if it changed
    pub fn sync_to_thread(&mut self) {
        let current = self.current_thread_id;
        if let Some(thread) = self.threads.iter_mut().find(|t| t.id == current) {
            if thread.messages != self.messages {
                thread.set_messages(self.messages.clone());
                self.dirty = true;
            }
        }
    }

    fn open(&mut self, id: Uuid) {
        self.current_thread_id = id;
        self.messages = self
            .threads
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.messages.clone())
            .unwrap_or_default();
    }

    /// Switch to an empty chat, reusing one if it already exists
    pub fn start_new_chat(&mut self) -> Result<Uuid> {
        self.ensure_can_manage()?;
        self.sync_to_thread();

        if self.messages.is_empty() {
            return Ok(self.current_thread_id);
        }

        let id = match self.threads.iter().find(|t| t.is_empty()) {
            Some(empty) => empty.id,
            None => {
                let thread = Thread::new();
                let id = thread.id;
                self.threads.insert(0, thread);
                self.dirty = true;
                id
            }
        };
        self.open(id);
        Ok(id)
    }

    /// Returns `false` if `id` is already open
    pub fn open_chat(&mut self, id: Uuid) -> Result<bool> {
        self.ensure_can_manage()?;
        if id == self.current_thread_id {
            return Ok(false);
        }
        if !self.threads.iter().any(|t| t.id == id) {
            return Err(SessionError::UnknownThread(id));
        }

        self.sync_to_thread();
        self.open(id);
        Ok(true)
    }

    /// Remove a thread; deleting the open one opens the most recent other
    /// thread, or a fresh one when none is left
    pub fn delete_chat(&mut self, id: Uuid) -> Result<()> {
        self.ensure_can_manage()?;
        let index = self
            .threads
            .iter()
            .position(|t| t.id == id)
            .ok_or(SessionError::UnknownThread(id))?;

        self.sync_to_thread();
        self.threads.remove(index);
        self.dirty = true;

        if id == self.current_thread_id {
            if self.threads.is_empty() {
                self.threads.push(Thread::new());
            }
            let next = self
                .threads
                .iter()
                .max_by_key(|t| t.updated_at)
                .map(|t| t.id);
            if let Some(next) = next {
                self.open(next);
            }
        }
        Ok(())
    }

    /// Append the user's message and an empty assistant placeholder.
    ///
    /// Returns the placeholder's id.
    pub fn append_exchange(&mut self, user_text: impl Into<String>, model: &str) -> Uuid {
        let placeholder = Message::assistant_placeholder(model);
        let id = placeholder.id;
        self.messages.push(Message::user(user_text));
        self.messages.push(placeholder);
        self.sync_to_thread();
        id
    }

    /// Returns `false` if the message is not in the open thread
    pub fn set_message_text(&mut self, id: Uuid, text: &str) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| m.id == id) else {
            return false;
        };
        if message.text != text {
            message.text = text.to_string();
            self.sync_to_thread();
        }
        true
    }

    pub fn set_message_model(&mut self, id: Uuid, model: &str) {
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == id) {
            if message.model_name.as_deref() != Some(model) {
                message.model_name = Some(model.to_string());
                self.sync_to_thread();
            }
        }
    }

    pub fn message_text(&self, id: Uuid) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.text.as_str())
    }

    /// Remove the message if it has no visible text; returns whether it did
    pub fn remove_if_blank(&mut self, id: Uuid) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != id || !m.is_blank());
        let removed = self.messages.len() != before;
        if removed {
            self.sync_to_thread();
        }
        removed
    }

    /// Sync, dedupe empty threads and return the collection to persist
    pub fn prepare_persist(&mut self) -> Vec<Thread> {
        self.sync_to_thread();
        let removed = dedupe_empty_threads(&mut self.threads, Some(self.current_thread_id));
        if removed > 0 {
            tracing::debug!(removed, "Dropped duplicate empty threads");
        }
        self.threads.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread_with(text: &str) -> Thread {
        let mut thread = Thread::new();
        thread.set_messages(vec![Message::user(text)]);
        thread
    }

    #[test]
    fn test_new_state_creates_thread_when_empty() {
        let state = SessionState::new(Vec::new());
        assert_eq!(state.threads().len(), 1);
        assert!(state.messages().is_empty());
        assert!(state.can_manage_history());
    }

    #[test]
    fn test_new_state_opens_most_recent_thread() {
        let older = thread_with("older");
        let mut newer = thread_with("newer");
        newer.updated_at = older.updated_at + chrono::Duration::seconds(1);
        let state = SessionState::new(vec![older, newer.clone()]);
        assert_eq!(state.current_thread_id(), newer.id);
        assert_eq!(state.messages()[0].text, "newer");
    }

    #[test]
    fn test_start_new_chat_reuses_empty_thread() {
        let mut state = SessionState::new(Vec::new());
        let first = state.current_thread_id();
        assert_eq!(state.start_new_chat().unwrap(), first);

        state.append_exchange("Hi", "m");
        let second = state.start_new_chat().unwrap();
        assert_ne!(second, first);
        assert_eq!(state.threads().len(), 2);

        // Going back and asking again lands on the same empty thread
        state.open_chat(first).unwrap();
        assert_eq!(state.start_new_chat().unwrap(), second);
        assert_eq!(state.threads().len(), 2);
    }

    #[test]
    fn test_history_is_locked_while_sending() {
        let other = thread_with("other");
        let mut state = SessionState::new(vec![other.clone(), Thread::new()]);
        state.set_sending(true);

        assert_eq!(state.start_new_chat(), Err(SessionError::HistoryLocked));
        assert_eq!(state.open_chat(other.id), Err(SessionError::HistoryLocked));
        assert_eq!(state.delete_chat(other.id), Err(SessionError::HistoryLocked));
        assert!(!state.can_manage_history());
    }

    #[test]
    fn test_open_unknown_chat_fails() {
        let mut state = SessionState::new(Vec::new());
        let id = Uuid::new_v4();
        assert_eq!(state.open_chat(id), Err(SessionError::UnknownThread(id)));
    }

    #[test]
    fn test_working_copy_syncs_into_thread() {
        let mut state = SessionState::new(Vec::new());
        let reply = state.append_exchange("Hello", "m");
        assert!(state.set_message_text(reply, "Hi there"));

        let thread = &state.threads()[0];
        assert_eq!(thread.title, "Hello");
        assert_eq!(thread.messages[1].text, "Hi there");
        assert!(state.is_dirty());
    }

    #[test]
    fn test_delete_last_chat_creates_fresh_one() {
        let mut state = SessionState::new(vec![thread_with("only")]);
        let id = state.current_thread_id();

        state.delete_chat(id).unwrap();

        assert_eq!(state.threads().len(), 1);
        assert_ne!(state.current_thread_id(), id);
        assert!(state.messages().is_empty());
    }

    #[test]
    fn test_delete_other_chat_keeps_current_open() {
        let a = thread_with("a");
        let b = thread_with("b");
        let mut state = SessionState::new(vec![a.clone(), b.clone()]);
        state.open_chat(a.id).unwrap();

        state.delete_chat(b.id).unwrap();

        assert_eq!(state.current_thread_id(), a.id);
        assert_eq!(state.threads().len(), 1);
    }

    #[test]
    fn test_remove_if_blank_keeps_partial_text() {
        let mut state = SessionState::new(Vec::new());
        let reply = state.append_exchange("Hi", "m");
        assert!(state.remove_if_blank(reply));
        assert_eq!(state.messages().len(), 1);

        let reply = state.append_exchange("Again", "m");
        state.set_message_text(reply, "partial");
        assert!(!state.remove_if_blank(reply));
        assert_eq!(state.message_text(reply), Some("partial"));
    }

    #[test]
    fn test_prepare_persist_keeps_open_empty_thread() {
        let full = thread_with("kept");
        let e1 = Thread::new();
        let e2 = Thread::new();
        let mut state = SessionState::new(vec![full.clone(), e1, e2.clone()]);
        state.open_chat(e2.id).unwrap();

        let threads = state.prepare_persist();

        assert_eq!(threads.len(), 2);
        assert!(threads.iter().any(|t| t.id == e2.id));
        assert!(threads.iter().any(|t| t == &full));
    }

    #[test]
    fn test_take_draft_trims_and_clears() {
        let mut state = SessionState::new(Vec::new());
        state.set_draft("   ");
        assert_eq!(state.take_draft(), None);

        state.set_draft("  Hello ");
        assert_eq!(state.take_draft().as_deref(), Some("Hello"));
        assert_eq!(state.draft(), "");
    }

    #[test]
    fn test_summaries_sorted_by_recency() {
        let old = thread_with("old");
        let mut new = thread_with("new");
        new.updated_at = old.updated_at + chrono::Duration::seconds(1);
        let state = SessionState::new(vec![old, new.clone()]);
        assert_eq!(state.summaries()[0].id, new.id);
    }
}
