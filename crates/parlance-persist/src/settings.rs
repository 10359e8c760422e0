use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::atomic::{to_sorted_json, write_atomic_blocking};
use crate::error::Result;

/// Credential handle the API key is stored under
pub const API_KEY_HANDLE: &str = "gemini-api-key";
pub const SELECTED_MODEL_KEY: &str = "selectedModel";
pub const SYSTEM_PROMPT_KEY: &str = "systemPrompt";
pub const SAFETY_PRESET_KEY: &str = "safetyPreset";

pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// String preferences; reads of unset keys return `None`
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Save / read / delete a secret string under a credential handle
pub trait SecretStore: Send + Sync {
    fn save_secret(&self, handle: &str, secret: &str) -> Result<()>;
    fn read_secret(&self, handle: &str) -> Result<Option<String>>;
    fn delete_secret(&self, handle: &str) -> Result<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Flat JSON object on disk, cached in memory and rewritten atomically
struct JsonKeyValueFile {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonKeyValueFile {
    fn open(path: PathBuf) -> Result<Self> {
        let entries = match std::fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let mut entries = lock(&self.entries);
        let mut next = entries.clone();
        apply(&mut next);
        if next == *entries {
            return Ok(());
        }

        let bytes = to_sorted_json(serde_json::to_value(&next)?)?;
        write_atomic_blocking(&self.path, &bytes)?;
        *entries = next;
        Ok(())
    }
}

/// Preferences in `settings.json`
pub struct FileSettingsStore {
    file: JsonKeyValueFile,
}

impl FileSettingsStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            file: JsonKeyValueFile::open(path.into())?,
        })
    }

    pub fn in_dir(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(data_dir.as_ref().join(SETTINGS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.file.get(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.file.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.file.update(|entries| {
            entries.remove(key);
        })
    }
}

/// Credentials in an owner-only `credentials.json`
pub struct FileSecretStore {
    file: JsonKeyValueFile,
}

impl FileSecretStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            file: JsonKeyValueFile::open(path.into())?,
        })
    }

    pub fn in_dir(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(data_dir.as_ref().join(CREDENTIALS_FILE_NAME))
    }
}

impl SecretStore for FileSecretStore {
    fn save_secret(&self, handle: &str, secret: &str) -> Result<()> {
        self.file.update(|entries| {
            entries.insert(handle.to_string(), secret.to_string());
        })
    }

    fn read_secret(&self, handle: &str) -> Result<Option<String>> {
        Ok(self.file.get(handle))
    }

    fn delete_secret(&self, handle: &str) -> Result<()> {
        self.file.update(|entries| {
            entries.remove(handle);
        })
    }
}

#[derive(Default)]
pub struct InMemorySettingsStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySecretStore {
    secrets: Mutex<BTreeMap<String, String>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for InMemorySecretStore {
    fn save_secret(&self, handle: &str, secret: &str) -> Result<()> {
        lock(&self.secrets).insert(handle.to_string(), secret.to_string());
        Ok(())
    }

    fn read_secret(&self, handle: &str) -> Result<Option<String>> {
        Ok(lock(&self.secrets).get(handle).cloned())
    }

    fn delete_secret(&self, handle: &str) -> Result<()> {
        lock(&self.secrets).remove(handle);
        Ok(())
    }
}
