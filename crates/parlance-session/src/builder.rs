use anyhow::{anyhow, Result};
use parlance_llm::GenerationClient;
use parlance_persist::PersistClient;
use std::sync::Arc;

use crate::actor::SessionActor;
use crate::config::SessionConfig;
use crate::handle::SessionHandle;

/// Builder for starting a chat session
pub struct SessionBuilder {
    client: Option<Arc<dyn GenerationClient>>,
    persist: Option<PersistClient>,
    config: SessionConfig,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self {
            client: None,
            persist: None,
            config: SessionConfig::default(),
        }
    }

    /// Set the generation client
    pub fn client(mut self, client: Arc<dyn GenerationClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set where history, preferences and the API key live
    pub fn persist(mut self, persist: PersistClient) -> Self {
        self.persist = Some(persist);
        self
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Load stored state and start the session actor.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn spawn(self) -> Result<SessionHandle> {
        let client = self
            .client
            .ok_or_else(|| anyhow!("Generation client is required"))?;
        let persist = self
            .persist
            .ok_or_else(|| anyhow!("Persistence client is required"))?;

        Ok(SessionActor::spawn(client, persist, self.config).await)
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
