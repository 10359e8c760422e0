use parlance_types::ConnectionStatus;

/// Tracks the API key and whether it has been verified.
///
/// Every key change bumps a generation; a check result carrying an older
/// generation belongs to a superseded key and is dropped.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    api_key: Option<String>,
    status: ConnectionStatus,
    generation: u64,
}

/// A connection check that has been started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCheck {
    pub generation: u64,
    pub api_key: String,
}

impl ConnectionTracker {
    pub fn new(api_key: Option<&str>) -> Self {
        let mut tracker = Self::default();
        tracker.set_key(api_key);
        tracker
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    /// Returns whether the key actually changed
    pub fn set_key(&mut self, api_key: Option<&str>) -> bool {
        let api_key = api_key.map(str::trim).filter(|k| !k.is_empty());
        if api_key == self.api_key.as_deref() {
            return false;
        }

        self.generation += 1;
        self.api_key = api_key.map(str::to_string);
        self.status = match self.api_key {
            Some(_) => ConnectionStatus::NotChecked,
            None => ConnectionStatus::NotConfigured,
        };
        true
    }

    /// Move to `Checking`; `None` when there is no key to check
    pub fn begin_check(&mut self) -> Option<PendingCheck> {
        let api_key = self.api_key.clone()?;
        self.status = ConnectionStatus::Checking;
        Some(PendingCheck {
            generation: self.generation,
            api_key,
        })
    }

    /// Apply a check result; returns `false` if it was stale
    pub fn finish_check(&mut self, generation: u64, result: Result<usize, String>) -> bool {
        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "Dropping stale connection check");
            return false;
        }

        self.status = match result {
            Ok(model_count) => ConnectionStatus::Connected { model_count },
            Err(message) => ConnectionStatus::Failed { message },
        };
        true
    }
}
