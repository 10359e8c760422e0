use async_trait::async_trait;
use parlance_types::Thread;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::atomic::{default_data_dir, to_sorted_json, write_atomic};
use crate::error::{PersistError, Result};

pub const THREADS_FILE_NAME: &str = "threads.json";

/// Load/save collaborator for the whole thread collection
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Every persisted thread; an absent or empty store yields an empty list
    async fn load(&self) -> Result<Vec<Thread>>;

    /// Replace the persisted collection with `threads`
    async fn save(&self, threads: &[Thread]) -> Result<()>;
}

/// Threads as one JSON array with sorted keys, replaced atomically on save
pub struct JsonThreadStore {
    path: PathBuf,
}

impl JsonThreadStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `threads.json` inside `data_dir`
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(data_dir.as_ref().join(THREADS_FILE_NAME))
    }

    /// `threads.json` in the per-user data directory
    pub fn at_default_location() -> Result<Self> {
        Ok(Self::in_dir(default_data_dir()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ThreadStore for JsonThreadStore {
    async fn load(&self) -> Result<Vec<Thread>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let threads: Vec<Thread> = serde_json::from_slice(&bytes)?;
        tracing::debug!(count = threads.len(), path = %self.path.display(), "Loaded threads");
        Ok(threads)
    }

    async fn save(&self, threads: &[Thread]) -> Result<()> {
        let bytes = to_sorted_json(serde_json::to_value(threads)?)?;
        write_atomic(&self.path, &bytes).await?;
        tracing::debug!(count = threads.len(), path = %self.path.display(), "Saved threads");
        Ok(())
    }
}

/// Volatile store that keeps every saved snapshot, for tests and `--ephemeral` runs
#[derive(Default)]
pub struct InMemoryThreadStore {
    inner: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    threads: Vec<Thread>,
    snapshots: Vec<Vec<Thread>>,
    fail_load: bool,
    fail_save: bool,
}

impl InMemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threads(threads: Vec<Thread>) -> Self {
        let store = Self::default();
        store.lock().threads = threads;
        store
    }

    /// Make subsequent loads fail
    pub fn fail_loads(self) -> Self {
        self.lock().fail_load = true;
        self
    }

    /// Make subsequent saves fail
    pub fn fail_saves(self) -> Self {
        self.lock().fail_save = true;
        self
    }

    /// Every collection passed to `save`, oldest first
    pub fn snapshots(&self) -> Vec<Vec<Thread>> {
        self.lock().snapshots.clone()
    }

    pub fn save_count(&self) -> usize {
        self.lock().snapshots.len()
    }

    pub fn current(&self) -> Vec<Thread> {
        self.lock().threads.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ThreadStore for InMemoryThreadStore {
    async fn load(&self) -> Result<Vec<Thread>> {
        let state = self.lock();
        if state.fail_load {
            return Err(PersistError::Internal("thread store unavailable".to_string()));
        }
        Ok(state.threads.clone())
    }

    async fn save(&self, threads: &[Thread]) -> Result<()> {
        let mut state = self.lock();
        if state.fail_save {
            return Err(PersistError::Internal("thread store is read-only".to_string()));
        }
        state.threads = threads.to_vec();
        state.snapshots.push(threads.to_vec());
        Ok(())
    }
}
