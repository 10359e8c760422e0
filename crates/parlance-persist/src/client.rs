use std::sync::Arc;

use crate::builder::PersistClientBuilder;
use crate::settings::{SecretStore, SettingsStore};
use crate::threads::ThreadStore;

/// The three persistence collaborators a chat session needs
#[derive(Clone)]
pub struct PersistClient {
    threads: Arc<dyn ThreadStore>,
    settings: Arc<dyn SettingsStore>,
    secrets: Arc<dyn SecretStore>,
}

impl PersistClient {
    pub fn new(
        threads: Arc<dyn ThreadStore>,
        settings: Arc<dyn SettingsStore>,
        secrets: Arc<dyn SecretStore>,
    ) -> Self {
        Self {
            threads,
            settings,
            secrets,
        }
    }

    pub fn builder() -> PersistClientBuilder {
        PersistClientBuilder::new()
    }

    pub fn threads(&self) -> Arc<dyn ThreadStore> {
        Arc::clone(&self.threads)
    }

    pub fn settings(&self) -> Arc<dyn SettingsStore> {
        Arc::clone(&self.settings)
    }

    pub fn secrets(&self) -> Arc<dyn SecretStore> {
        Arc::clone(&self.secrets)
    }
}
