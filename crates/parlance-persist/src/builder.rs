use std::path::PathBuf;
use std::sync::Arc;

use crate::atomic::default_data_dir;
use crate::client::PersistClient;
use crate::error::Result;
use crate::settings::{
    FileSecretStore, FileSettingsStore, InMemorySecretStore, InMemorySettingsStore, SecretStore,
    SettingsStore,
};
use crate::threads::{InMemoryThreadStore, JsonThreadStore, ThreadStore};

/// Builds a [`PersistClient`]; stores not set explicitly are file-backed in
/// the data directory, or volatile when `in_memory` is set
pub struct PersistClientBuilder {
    data_dir: Option<PathBuf>,
    in_memory: bool,
    threads: Option<Arc<dyn ThreadStore>>,
    settings: Option<Arc<dyn SettingsStore>>,
    secrets: Option<Arc<dyn SecretStore>>,
}

impl PersistClientBuilder {
    pub fn new() -> Self {
        Self {
            data_dir: None,
            in_memory: false,
            threads: None,
            settings: None,
            secrets: None,
        }
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn in_memory(mut self) -> Self {
        self.in_memory = true;
        self
    }

    pub fn thread_store(mut self, store: Arc<dyn ThreadStore>) -> Self {
        self.threads = Some(store);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(store);
        self
    }

    pub fn secret_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.secrets = Some(store);
        self
    }

    pub fn build(self) -> Result<PersistClient> {
        if self.in_memory {
            return Ok(PersistClient::new(
                self.threads.unwrap_or_else(|| Arc::new(InMemoryThreadStore::new())),
                self.settings.unwrap_or_else(|| Arc::new(InMemorySettingsStore::new())),
                self.secrets.unwrap_or_else(|| Arc::new(InMemorySecretStore::new())),
            ));
        }

        let data_dir = match self.data_dir {
            Some(dir) => dir,
            None => default_data_dir()?,
        };
        tracing::debug!(data_dir = %data_dir.display(), "Using file-backed persistence");

        let threads: Arc<dyn ThreadStore> = match self.threads {
            Some(store) => store,
            None => Arc::new(JsonThreadStore::in_dir(&data_dir)),
        };
        let settings: Arc<dyn SettingsStore> = match self.settings {
            Some(store) => store,
            None => Arc::new(FileSettingsStore::in_dir(&data_dir)?),
        };
        let secrets: Arc<dyn SecretStore> = match self.secrets {
            Some(store) => store,
            None => Arc::new(FileSecretStore::in_dir(&data_dir)?),
        };

        Ok(PersistClient::new(threads, settings, secrets))
    }
}

impl Default for PersistClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
