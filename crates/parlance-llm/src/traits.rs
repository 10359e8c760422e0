use crate::error::{GenerationError, Result};
use crate::streaming::TextStream;
use crate::types::{
    strip_model_prefix, Content, GenerateContentBody, SafetyPreset, SystemInstruction,
};
use async_trait::async_trait;

/// Model used when nothing has been selected yet
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Preferred models, best first, when the selected one is unavailable
pub const MODEL_PRIORITY: [&str; 5] = [
    "gemini-2.5-flash",
    "gemini-2.0-flash",
    "gemini-1.5-flash",
    "gemini-2.5-pro",
    "gemini-1.5-pro",
];

/// Trait for text generation against a Gemini-style API
///
/// Implementations own transport details; callers only see cumulative text
/// and [`GenerationError`].
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Non-streaming generation; returns the full trimmed reply
    async fn generate_reply(&self, request: &GenerateRequest) -> Result<String>;

    /// Streaming generation; each item is the whole reply so far
    async fn stream_generate_reply(&self, request: &GenerateRequest) -> Result<TextStream>;

    /// Model ids that support `generateContent` (and streaming, if required),
    /// deduplicated and sorted
    async fn list_generate_content_models(
        &self,
        api_key: &str,
        require_streaming: bool,
    ) -> Result<Vec<String>>;

    /// Pick a usable model for `api_key`, preferring `preferred_model`
    async fn resolve_model_and_available_models(
        &self,
        api_key: &str,
        preferred_model: &str,
    ) -> Result<ModelResolution> {
        let mut available = self.list_generate_content_models(api_key, true).await?;
        if available.is_empty() {
            tracing::debug!("No streaming models listed, falling back to all generate models");
            available = self.list_generate_content_models(api_key, false).await?;
        }

        let model = pick_model(&available, preferred_model).ok_or(GenerationError::NoModelsAvailable)?;
        Ok(ModelResolution { model, available })
    }
}

/// Outcome of model resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelResolution {
    pub model: String,
    pub available: Vec<String>,
}

/// Preferred model if listed, else the first priority hit, else the first model
pub fn pick_model(available: &[String], preferred: &str) -> Option<String> {
    let preferred = strip_model_prefix(preferred);
    if !preferred.is_empty() && available.iter().any(|m| m == preferred) {
        return Some(preferred.to_string());
    }

    MODEL_PRIORITY
        .iter()
        .find(|candidate| available.iter().any(|m| m == *candidate))
        .map(|m| m.to_string())
        .or_else(|| available.first().cloned())
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub api_key: String,
    pub model: String,
    pub contents: Vec<Content>,
    pub system_prompt: Option<String>,
    pub safety: SafetyPreset,
}

impl GenerateRequest {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, contents: Vec<Content>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            contents,
            system_prompt: None,
            safety: SafetyPreset::Default,
        }
    }

    /// Blank prompts are treated as absent
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        self
    }

    pub fn with_safety(mut self, safety: SafetyPreset) -> Self {
        self.safety = safety;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn has_system_prompt(&self) -> bool {
        self.system_prompt.is_some()
    }

    /// Wire body for both generate endpoints
    pub fn body(&self) -> GenerateContentBody {
        GenerateContentBody {
            contents: self.contents.clone(),
            system_instruction: self
                .system_prompt
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(SystemInstruction::new),
            safety_settings: self.safety.settings(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn models(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pick_model_prefers_selection() {
        let available = models(&["gemini-1.5-pro", "gemini-2.5-flash", "gemma-3"]);
        assert_eq!(pick_model(&available, "gemma-3").as_deref(), Some("gemma-3"));
        assert_eq!(pick_model(&available, "models/gemma-3").as_deref(), Some("gemma-3"));
    }

    #[test]
    fn test_pick_model_uses_priority_then_first() {
        let available = models(&["gemini-1.5-pro", "gemini-2.0-flash"]);
        assert_eq!(pick_model(&available, "gone").as_deref(), Some("gemini-2.0-flash"));

        let available = models(&["aardvark", "zebra"]);
        assert_eq!(pick_model(&available, "").as_deref(), Some("aardvark"));

        assert_eq!(pick_model(&[], "gemini-2.5-flash"), None);
    }

    #[test]
    fn test_request_builder_normalizes_prompt() {
        let request = GenerateRequest::new("key", "m", vec![Content::user("Hi")])
            .with_system_prompt(Some("   ".to_string()));
        assert!(!request.has_system_prompt());
        assert!(request.body().system_instruction.is_none());

        let request = request.with_system_prompt(Some("  Be terse ".to_string()));
        assert_eq!(request.system_prompt.as_deref(), Some("Be terse"));
        assert_eq!(
            request.body().system_instruction,
            Some(SystemInstruction::new("Be terse"))
        );
    }

    #[test]
    fn test_request_body_applies_safety() {
        let request = GenerateRequest::new("key", "m", vec![Content::user("Hi")])
            .with_safety(SafetyPreset::Strict);
        let body = request.body();
        assert_eq!(body.safety_settings.len(), 4);
        assert!(body
            .safety_settings
            .iter()
            .all(|s| s.threshold == "BLOCK_LOW_AND_ABOVE"));
    }
}
