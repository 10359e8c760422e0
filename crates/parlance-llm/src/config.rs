// Client configuration

use serde::{Deserialize, Serialize};

/// Public Gemini endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Upper bound on `nextPageToken` hops when listing models
pub const DEFAULT_MAX_MODEL_PAGES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API root, without a trailing `/models`
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_model_pages")]
    pub max_model_pages: usize,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_max_model_pages() -> usize {
    DEFAULT_MAX_MODEL_PAGES
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_model_pages: DEFAULT_MAX_MODEL_PAGES,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_model_pages(mut self, pages: usize) -> Self {
        self.max_model_pages = pages.max(1);
        self
    }
}
