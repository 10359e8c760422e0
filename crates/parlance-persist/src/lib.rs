//! Local persistence for Parlance: the thread collection, preferences and
//! the API key credential.

pub mod atomic;
pub mod builder;
pub mod client;
pub mod dedupe;
pub mod error;
pub mod settings;
pub mod threads;

pub use atomic::default_data_dir;
pub use builder::PersistClientBuilder;
pub use client::PersistClient;
pub use dedupe::dedupe_empty_threads;
pub use error::{PersistError, Result};
pub use settings::{
    FileSecretStore, FileSettingsStore, InMemorySecretStore, InMemorySettingsStore, SecretStore,
    SettingsStore, API_KEY_HANDLE, SAFETY_PRESET_KEY, SELECTED_MODEL_KEY, SYSTEM_PROMPT_KEY,
};
pub use threads::{InMemoryThreadStore, JsonThreadStore, ThreadStore};
