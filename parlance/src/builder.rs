use anyhow::{bail, Context, Result};
use parlance_llm::{ClientConfig, GeminiClient, SafetyPreset};
use parlance_persist::PersistClient;
use parlance_session::{SessionBuilder, SessionConfig, SessionHandle};
use std::path::PathBuf;
use std::sync::Arc;

/// High-level builder for a Gemini chat session
///
/// # Example
///
/// ```rust,no_run
/// use parlance::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() -> Result<()> {
/// let chat = ChatBuilder::new()
///     .api_key("AIza...")
///     .model("gemini-2.5-flash")
///     .system_prompt("Answer in one sentence.")
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct ChatBuilder {
    api_key: Option<String>,
    client_config: ClientConfig,
    data_dir: Option<PathBuf>,
    in_memory: bool,
    model: Option<String>,
    system_prompt: Option<String>,
    safety: Option<SafetyPreset>,
    session_config: SessionConfig,
}

impl Default for ChatBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatBuilder {
    /// History under the platform data directory, the public endpoint and
    /// whatever key and preferences are already stored
    pub fn new() -> Self {
        Self {
            api_key: None,
            client_config: ClientConfig::default(),
            data_dir: None,
            in_memory: false,
            model: None,
            system_prompt: None,
            safety: None,
            session_config: SessionConfig::default(),
        }
    }

    /// Store this API key (replacing any saved one)
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Talk to a different API root, e.g. a proxy
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.client_config = self.client_config.with_base_url(url);
        self
    }

    /// Keep history and preferences in `dir`
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Keep nothing on disk
    pub fn in_memory(mut self) -> Self {
        self.in_memory = true;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn safety(mut self, preset: SafetyPreset) -> Self {
        self.safety = Some(preset);
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Start the session
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the HTTP client cannot be created
    /// - no data directory can be determined
    /// - the API key cannot be stored
    pub async fn build(self) -> Result<Chat> {
        let client = GeminiClient::with_config(self.client_config)
            .context("Failed to create Gemini client")?;

        let mut persist = PersistClient::builder();
        if self.in_memory {
            persist = persist.in_memory();
        } else if let Some(dir) = self.data_dir {
            persist = persist.data_dir(dir);
        }
        let persist = persist.build().context("Failed to open local storage")?;

        let session = SessionBuilder::new()
            .client(Arc::new(client))
            .persist(persist)
            .config(self.session_config)
            .spawn()
            .await?;

        if let Some(key) = self.api_key {
            session
                .set_api_key(key)
                .await
                .context("Failed to store API key")?;
        }
        if let Some(model) = self.model {
            session.set_model(model)?;
        }
        if let Some(prompt) = self.system_prompt {
            session.set_system_prompt(prompt)?;
        }
        if let Some(preset) = self.safety {
            session.set_safety_preset(preset)?;
        }

        Ok(Chat { session })
    }
}

/// A running chat session
pub struct Chat {
    session: SessionHandle,
}

impl Chat {
    /// Send `message` in the open thread and wait for the whole reply
    ///
    /// # Example
    /// ```rust,no_run
    /// # use parlance::prelude::*;
    /// # async fn example(chat: Chat) -> Result<()> {
    /// let answer = chat.ask("What is 2+2?").await?;
    /// println!("{answer}");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn ask(&self, message: impl Into<String>) -> Result<String> {
        let message = message.into();
        if message.trim().is_empty() {
            bail!("Message is empty");
        }
        if !self.session.snapshot().has_api_key {
            bail!("No API key configured");
        }
        if !self.session.send_message(message).await? {
            bail!("A reply is already in progress");
        }

        let snapshot = self.session.wait_until_idle().await?;
        if let Some(error) = snapshot.error_message {
            bail!(error);
        }
        match snapshot.last_reply() {
            Some(reply) if !reply.is_empty() => Ok(reply.to_string()),
            _ => bail!("The reply was cancelled"),
        }
    }

    /// The underlying session for streaming updates and history management
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Persist history and stop the session
    pub async fn shutdown(&self) -> Result<()> {
        self.session.shutdown().await?;
        Ok(())
    }
}
