use parlance_types::SafetyPreset;
use tokio::sync::{mpsc, oneshot, watch};
use uuid::Uuid;

use crate::actor::{Command, Reply};
use crate::error::{Result, SessionError};
use crate::snapshot::SessionSnapshot;

/// Cloneable front end of a running session.
///
/// Commands are queued to the session actor and applied in order; every
/// applied command republishes the [`SessionSnapshot`] visible through
/// [`snapshot`](Self::snapshot) and [`subscribe`](Self::subscribe).
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        snapshots: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self {
            commands,
            snapshots,
        }
    }

    fn post(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::Closed)
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.post(command(tx))?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// The latest published state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Watch for state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Resolve with the first snapshot matching `predicate`, which may be
    /// the current one
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<SessionSnapshot>
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(snapshot.clone())
    }

    /// Resolve once no reply is in flight
    pub async fn wait_until_idle(&self) -> Result<SessionSnapshot> {
        self.wait_for(|s| !s.is_sending).await
    }

    pub fn set_draft(&self, draft: impl Into<String>) -> Result<()> {
        self.post(Command::SetDraft(draft.into()))
    }

    /// Send the current draft.
    ///
    /// Returns `false` without doing anything while a reply is in flight,
    /// when the draft is blank or when no API key is configured.
    pub async fn send(&self) -> Result<bool> {
        self.request(|reply| Command::Send { reply }).await
    }

    /// Replace the draft with `text` and send it
    pub async fn send_message(&self, text: impl Into<String>) -> Result<bool> {
        self.set_draft(text)?;
        self.send().await
    }

    /// Stop the reply in flight, keeping whatever text has been shown
    pub fn cancel_response(&self) -> Result<()> {
        self.post(Command::Cancel)
    }

    pub async fn start_new_chat(&self) -> Result<Uuid> {
        self.request(|reply| Command::StartNewChat { reply }).await?
    }

    pub async fn open_chat(&self, id: Uuid) -> Result<()> {
        self.request(|reply| Command::OpenChat { id, reply }).await?
    }

    pub async fn delete_chat(&self, id: Uuid) -> Result<()> {
        self.request(|reply| Command::DeleteChat { id, reply }).await?
    }

    /// Store a new API key; a blank key clears it
    pub async fn set_api_key(&self, api_key: impl Into<String>) -> Result<()> {
        let api_key = Some(api_key.into());
        self.request(|reply| Command::SetApiKey { api_key, reply })
            .await?
    }

    pub async fn clear_api_key(&self) -> Result<()> {
        self.request(|reply| Command::SetApiKey {
            api_key: None,
            reply,
        })
        .await?
    }

    pub fn set_model(&self, model: impl Into<String>) -> Result<()> {
        self.post(Command::SetModel(model.into()))
    }

    pub fn set_system_prompt(&self, prompt: impl Into<String>) -> Result<()> {
        self.post(Command::SetSystemPrompt(prompt.into()))
    }

    pub fn set_safety_preset(&self, preset: SafetyPreset) -> Result<()> {
        self.post(Command::SetSafetyPreset(preset))
    }

    /// Verify the API key by listing models; the outcome lands in
    /// [`SessionSnapshot::connection`]
    pub fn check_connection(&self) -> Result<()> {
        self.post(Command::CheckConnection)
    }

    /// Write history to storage now
    pub async fn flush(&self) -> Result<()> {
        self.request(|reply| Command::Flush { reply }).await
    }

    /// Cancel any reply in flight, persist and stop the session
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}
