use config::{Config as ConfigLoader, ConfigError, Environment, File};
use parlance_llm::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use parlance_session::{SessionConfig, DEFAULT_PERSIST_DEBOUNCE};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    // Secret (from ENV only)
    #[serde(skip)]
    pub gemini_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// History location; the per-user data directory when unset
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_model")]
    pub default_model: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            debounce_ms: default_debounce_ms(),
            default_model: default_model(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_debounce_ms() -> u64 {
    DEFAULT_PERSIST_DEBOUNCE.as_millis() as u64
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. `PARLANCE_{SECTION}__{KEY}` environment variables
    /// 4. Flat API_, CHAT_ and LOG_ variables
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("PARLANCE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut cfg: Config = builder.build()?.try_deserialize()?;
        cfg.apply_env_overrides();

        cfg.gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));
        builder.build()?.try_deserialize()
    }

    /// Flat variables such as `CHAT_DEBOUNCE_MS` or `LOG_LEVEL`
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("API_BASE_URL") {
            self.api.base_url = url;
        }
        if let Ok(dir) = std::env::var("CHAT_DATA_DIR") {
            self.chat.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(ms) = std::env::var("CHAT_DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.chat.debounce_ms = ms;
        }
        if let Ok(model) = std::env::var("CHAT_DEFAULT_MODEL") {
            self.chat.default_model = model;
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new().with_base_url(self.api.base_url.clone())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new()
            .with_persist_debounce(Duration::from_millis(self.chat.debounce_ms))
            .with_default_model(self.chat.default_model.clone())
    }
}
