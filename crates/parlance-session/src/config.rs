use parlance_llm::DEFAULT_MODEL;
use std::time::Duration;

/// Quiet period before a streamed-text mutation is persisted
pub const DEFAULT_PERSIST_DEBOUNCE: Duration = Duration::from_millis(900);

/// Reveal rate for replies that arrive in one piece (chars/second)
pub const FULL_REPLY_RATE: f64 = 120.0;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub persist_debounce: Duration,
    pub full_reply_rate: f64,
    /// Model used when no preference is stored
    pub default_model: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persist_debounce: DEFAULT_PERSIST_DEBOUNCE,
            full_reply_rate: FULL_REPLY_RATE,
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_persist_debounce(mut self, debounce: Duration) -> Self {
        self.persist_debounce = debounce;
        self
    }

    pub fn with_full_reply_rate(mut self, rate: f64) -> Self {
        self.full_reply_rate = rate;
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }
}
