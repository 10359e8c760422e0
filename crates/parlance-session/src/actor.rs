//! The session actor: sole owner of chat state.
//!
//! Every mutation arrives as a [`Command`] on one channel, including the
//! progress and completion events posted back by spawned generation tasks,
//! so state is never touched from two places at once. After each command
//! the actor publishes a fresh [`SessionSnapshot`].

use parlance_llm::types::strip_model_prefix;
use parlance_llm::{GenerateRequest, GenerationClient, GenerationError};
use parlance_persist::{
    PersistClient, SecretStore, SettingsStore, ThreadStore, API_KEY_HANDLE, SAFETY_PRESET_KEY,
    SELECTED_MODEL_KEY, SYSTEM_PROMPT_KEY,
};
use parlance_types::{to_contents, SafetyPreset};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::connection::ConnectionTracker;
use crate::debounce::Debouncer;
use crate::error::{Result, SessionError};
use crate::handle::SessionHandle;
use crate::orchestrator::{Orchestrator, SendReport};
use crate::snapshot::SessionSnapshot;
use crate::state::SessionState;

pub(crate) type Reply<T> = oneshot::Sender<T>;

pub(crate) enum Command {
    SetDraft(String),
    Send {
        reply: Reply<bool>,
    },
    Cancel,
    StartNewChat {
        reply: Reply<Result<Uuid>>,
    },
    OpenChat {
        id: Uuid,
        reply: Reply<Result<()>>,
    },
    DeleteChat {
        id: Uuid,
        reply: Reply<Result<()>>,
    },
    SetApiKey {
        api_key: Option<String>,
        reply: Reply<Result<()>>,
    },
    SetModel(String),
    SetSystemPrompt(String),
    SetSafetyPreset(SafetyPreset),
    CheckConnection,
    Flush {
        reply: Reply<()>,
    },
    Shutdown {
        reply: Reply<()>,
    },

    // Posted by tasks the actor spawned
    ReplyProgress {
        send_id: u64,
        text: String,
    },
    SendFinished {
        send_id: u64,
        outcome: parlance_llm::Result<SendReport>,
    },
    ConnectionChecked {
        generation: u64,
        result: parlance_llm::Result<Vec<String>>,
    },
    DebounceFired {
        generation: u64,
    },
}

struct ActiveSend {
    id: u64,
    message_id: Uuid,
    cancel: CancellationToken,
}

pub(crate) struct SessionActor {
    state: SessionState,
    orchestrator: Arc<Orchestrator>,
    client: Arc<dyn GenerationClient>,
    threads: Arc<dyn ThreadStore>,
    settings: Arc<dyn SettingsStore>,
    secrets: Arc<dyn SecretStore>,
    connection: ConnectionTracker,
    debouncer: Debouncer,
    active_send: Option<ActiveSend>,
    next_send_id: u64,
    selected_model: String,
    available_models: Vec<String>,
    system_prompt: String,
    safety_preset: SafetyPreset,
    error_message: Option<String>,
    notice: Option<String>,
    history_warning: Option<String>,
    commands: mpsc::WeakUnboundedSender<Command>,
    snapshots: watch::Sender<SessionSnapshot>,
}

/// Trimmed model id without the `models/` prefix; `None` if blank
fn normalize_model(model: &str) -> Option<String> {
    let id = strip_model_prefix(model);
    (!id.is_empty()).then(|| id.to_string())
}

impl SessionActor {
    /// Load history and preferences, then run the actor on its own task
    pub(crate) async fn spawn(
        client: Arc<dyn GenerationClient>,
        persist: PersistClient,
        config: SessionConfig,
    ) -> SessionHandle {
        let threads = persist.threads();
        let settings = persist.settings();
        let secrets = persist.secrets();

        let (loaded, history_warning) = match threads.load().await {
            Ok(loaded) => {
                tracing::info!(threads = loaded.len(), "Loaded chat history");
                (loaded, None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load chat history, starting empty");
                (Vec::new(), Some(format!("Could not load chat history: {e}")))
            }
        };

        let api_key = secrets.read_secret(API_KEY_HANDLE).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read stored API key");
            None
        });
        let read_setting = |key: &str| {
            settings.get(key).unwrap_or_else(|e| {
                tracing::warn!(key, error = %e, "Failed to read setting");
                None
            })
        };
        let selected_model = read_setting(SELECTED_MODEL_KEY)
            .and_then(|m| normalize_model(&m))
            .unwrap_or_else(|| config.default_model.clone());
        let system_prompt = read_setting(SYSTEM_PROMPT_KEY).unwrap_or_default();
        let safety_preset = read_setting(SAFETY_PRESET_KEY)
            .and_then(|p| p.parse().ok())
            .unwrap_or_default();

        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshots, snapshot_rx) = watch::channel(SessionSnapshot::default());

        let actor = Self {
            state: SessionState::new(loaded),
            orchestrator: Arc::new(Orchestrator::new(Arc::clone(&client), config.full_reply_rate)),
            client,
            threads,
            settings,
            secrets,
            connection: ConnectionTracker::new(api_key.as_deref()),
            debouncer: Debouncer::new(config.persist_debounce),
            active_send: None,
            next_send_id: 0,
            selected_model,
            available_models: Vec::new(),
            system_prompt,
            safety_preset,
            error_message: None,
            notice: None,
            history_warning,
            commands: tx.downgrade(),
            snapshots,
        };
        actor.publish();

        tokio::spawn(actor.run(rx));
        SessionHandle::new(tx, snapshot_rx)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            if !self.handle(command).await {
                return;
            }
        }

        // Every handle is gone
        tracing::debug!("Session handles dropped, shutting down");
        self.cancel_send().await;
        if self.state.is_dirty() {
            self.persist_now().await;
        }
    }

    /// Returns `false` once the actor should stop
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::SetDraft(draft) => {
                self.state.set_draft(draft);
                self.publish();
            }
            Command::Send { reply } => {
                let started = self.start_send().await;
                self.publish();
                let _ = reply.send(started);
            }
            Command::Cancel => {
                self.cancel_send().await;
                self.publish();
            }
            Command::StartNewChat { reply } => {
                let result = self.state.start_new_chat();
                if result.is_ok() {
                    self.after_chat_switch().await;
                }
                self.publish();
                let _ = reply.send(result);
            }
            Command::OpenChat { id, reply } => {
                let result = self.state.open_chat(id);
                if let Ok(true) = result {
                    self.after_chat_switch().await;
                }
                self.publish();
                let _ = reply.send(result.map(|_| ()));
            }
            Command::DeleteChat { id, reply } => {
                let result = self.state.delete_chat(id);
                if result.is_ok() {
                    self.after_chat_switch().await;
                }
                self.publish();
                let _ = reply.send(result);
            }
            Command::SetApiKey { api_key, reply } => {
                let result = self.set_api_key(api_key);
                self.publish();
                let _ = reply.send(result);
            }
            Command::SetModel(model) => {
                self.set_model(&model);
                self.publish();
            }
            Command::SetSystemPrompt(prompt) => {
                self.system_prompt = prompt;
                self.store_setting(SYSTEM_PROMPT_KEY, &self.system_prompt);
                self.publish();
            }
            Command::SetSafetyPreset(preset) => {
                self.safety_preset = preset;
                self.store_setting(SAFETY_PRESET_KEY, preset.as_str());
                self.publish();
            }
            Command::CheckConnection => {
                self.check_connection();
                self.publish();
            }
            Command::Flush { reply } => {
                self.persist_now().await;
                self.publish();
                let _ = reply.send(());
            }
            Command::Shutdown { reply } => {
                self.cancel_send().await;
                self.persist_now().await;
                self.publish();
                let _ = reply.send(());
                return false;
            }
            Command::ReplyProgress { send_id, text } => {
                let Some(message_id) = self.active_message(send_id) else {
                    return true;
                };
                if self.state.set_message_text(message_id, &text) {
                    self.schedule_persist();
                }
                self.publish();
            }
            Command::SendFinished { send_id, outcome } => {
                let Some(message_id) = self.active_message(send_id) else {
                    tracing::debug!(send_id, "Ignoring result of a superseded send");
                    return true;
                };
                self.active_send = None;
                self.complete_send(message_id, outcome).await;
                self.publish();
            }
            Command::ConnectionChecked { generation, result } => {
                let counted = result
                    .as_ref()
                    .map(Vec::len)
                    .map_err(ToString::to_string);
                if self.connection.finish_check(generation, counted) {
                    if let Ok(models) = result {
                        self.available_models = models;
                    }
                }
                self.publish();
            }
            Command::DebounceFired { generation } => {
                if self.debouncer.fired(generation) && self.state.is_dirty() {
                    self.persist_now().await;
                    self.publish();
                }
            }
        }
        true
    }

    fn active_message(&self, send_id: u64) -> Option<Uuid> {
        self.active_send
            .as_ref()
            .filter(|active| active.id == send_id)
            .map(|active| active.message_id)
    }

    async fn after_chat_switch(&mut self) {
        self.error_message = None;
        self.notice = None;
        self.persist_now().await;
    }

    async fn start_send(&mut self) -> bool {
        if self.state.is_sending() {
            return false;
        }
        let Some(api_key) = self.connection.api_key().map(str::to_string) else {
            tracing::debug!("Send ignored: no API key");
            return false;
        };
        let Some(commands) = self.commands.upgrade() else {
            return false;
        };
        let Some(text) = self.state.take_draft() else {
            return false;
        };

        self.error_message = None;
        self.notice = None;

        let model = self.selected_model.clone();
        let message_id = self.state.append_exchange(text, &model);
        let contents = to_contents(self.state.messages());
        self.state.set_sending(true);
        self.persist_now().await;

        let request = GenerateRequest::new(api_key, model, contents)
            .with_system_prompt(Some(self.system_prompt.clone()))
            .with_safety(self.safety_preset);

        self.next_send_id += 1;
        let send_id = self.next_send_id;
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let orchestrator = Arc::clone(&self.orchestrator);

        tracing::info!(send_id, model = %request.model, "Sending message");
        tokio::spawn(async move {
            let progress = commands.clone();
            let mut sink = move |text: &str| {
                let _ = progress.send(Command::ReplyProgress {
                    send_id,
                    text: text.to_string(),
                });
            };
            let outcome = orchestrator.send(request, &mut sink, &task_cancel).await;
            let _ = commands.send(Command::SendFinished { send_id, outcome });
        });

        self.active_send = Some(ActiveSend {
            id: send_id,
            message_id,
            cancel,
        });
        true
    }

    async fn cancel_send(&mut self) {
        let Some(active) = self.active_send.take() else {
            return;
        };
        tracing::info!(send_id = active.id, "Cancelling send");
        active.cancel.cancel();
        self.complete_send(active.message_id, Err(GenerationError::Cancelled))
            .await;
    }

    async fn complete_send(&mut self, message_id: Uuid, outcome: parlance_llm::Result<SendReport>) {
        self.state.set_sending(false);

        match outcome {
            Ok(report) => {
                if report.model_substituted() {
                    self.selected_model = report.model_used.clone();
                    self.store_setting(SELECTED_MODEL_KEY, &report.model_used);
                }
                if let Some(models) = &report.available_models {
                    self.available_models = models.clone();
                }
                self.state.set_message_model(message_id, &report.model_used);
                self.state.set_message_text(message_id, &report.text);
                self.notice = report.notice();
                tracing::info!(model = %report.model_used, chars = report.text.chars().count(), "Reply complete");
            }
            Err(GenerationError::Cancelled) => {
                self.state.remove_if_blank(message_id);
            }
            Err(err) => {
                tracing::warn!(error = %err, "Send failed");
                if self.state.remove_if_blank(message_id) {
                    self.error_message = Some(err.to_string());
                }
            }
        }

        self.persist_now().await;
    }

    fn set_api_key(&mut self, api_key: Option<String>) -> Result<()> {
        let api_key = api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        let stored = match &api_key {
            Some(key) => self.secrets.save_secret(API_KEY_HANDLE, key),
            None => self.secrets.delete_secret(API_KEY_HANDLE),
        };
        stored.map_err(|e| SessionError::Storage(e.to_string()))?;

        if self.connection.set_key(api_key.as_deref()) {
            tracing::info!(configured = api_key.is_some(), "API key changed");
            self.available_models.clear();
        }
        Ok(())
    }

    fn set_model(&mut self, model: &str) {
        let Some(model) = normalize_model(model) else {
            return;
        };
        if model != self.selected_model {
            self.store_setting(SELECTED_MODEL_KEY, &model);
            self.selected_model = model;
        }
    }

    /// Persist a preference; an empty value removes it
    fn store_setting(&self, key: &str, value: &str) {
        let result = if value.is_empty() {
            self.settings.remove(key)
        } else {
            self.settings.set(key, value)
        };
        if let Err(e) = result {
            tracing::warn!(key, error = %e, "Failed to store setting");
        }
    }

    fn check_connection(&mut self) {
        let Some(commands) = self.commands.upgrade() else {
            return;
        };
        let Some(check) = self.connection.begin_check() else {
            return;
        };

        let client = Arc::clone(&self.client);
        tokio::spawn(async move {
            let result = client.list_generate_content_models(&check.api_key, false).await;
            let _ = commands.send(Command::ConnectionChecked {
                generation: check.generation,
                result,
            });
        });
    }

    fn schedule_persist(&mut self) {
        let Some(commands) = self.commands.upgrade() else {
            return;
        };
        self.debouncer.schedule(move |generation| {
            let _ = commands.send(Command::DebounceFired { generation });
        });
    }

    async fn persist_now(&mut self) {
        self.debouncer.cancel();
        let threads = self.state.prepare_persist();

        match self.threads.save(&threads).await {
            Ok(()) => {
                self.state.mark_clean();
                tracing::debug!(threads = threads.len(), "Chat history saved");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to save chat history");
                self.history_warning = Some(format!("Could not save chat history: {e}"));
            }
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_thread_id: self.state.current_thread_id(),
            messages: self.state.messages().to_vec(),
            threads: self.state.summaries(),
            draft: self.state.draft().to_string(),
            is_sending: self.state.is_sending(),
            can_manage_history: self.state.can_manage_history(),
            has_api_key: self.connection.api_key().is_some(),
            selected_model: self.selected_model.clone(),
            available_models: self.available_models.clone(),
            system_prompt: self.system_prompt.clone(),
            safety_preset: self.safety_preset,
            connection: self.connection.status().clone(),
            error_message: self.error_message.clone(),
            notice: self.notice.clone(),
            history_warning: self.history_warning.clone(),
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}
