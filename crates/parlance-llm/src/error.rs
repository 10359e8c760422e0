use thiserror::Error;

/// Body fragments the API returns when a model rejects `systemInstruction`.
const SYSTEM_PROMPT_UNSUPPORTED_SIGNATURES: [&str; 3] = [
    "developer instruction is not enabled",
    "system instruction is not enabled",
    "system_instruction",
];

/// Everything that can go wrong while talking to the generation API.
///
/// Only [`GenerationError::Api`] carries a machine-checkable status code;
/// the retry orchestration branches on it and nothing else.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("The server returned an invalid response")]
    InvalidResponse,

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("API error ({status}): {}", display_body(.body))]
    Api { status: u16, body: String },

    #[error("The model returned an empty response")]
    EmptyResponse,

    #[error("The prompt was blocked ({reason})")]
    Blocked { reason: String },

    #[error("No generation models are available for this API key")]
    NoModelsAvailable,

    #[error("Cancelled")]
    Cancelled,
}

impl GenerationError {
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// 400 whose body says the model does not accept a system prompt.
    pub fn is_system_prompt_unsupported(&self) -> bool {
        match self {
            Self::Api { status: 400, body } => {
                let body = body.to_ascii_lowercase();
                SYSTEM_PROMPT_UNSUPPORTED_SIGNATURES
                    .iter()
                    .any(|signature| body.contains(signature))
            }
            _ => false,
        }
    }

    /// 404: the model is not served for this key.
    pub fn is_model_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// Failures below the API layer, where a non-streaming retry may still succeed.
    pub fn should_fall_back(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::InvalidResponse | Self::EmptyResponse
        )
    }
}

/// Best-effort extraction of `error.message` from an API error body.
pub fn api_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.trim();
    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}

fn display_body(body: &str) -> String {
    api_error_message(body).unwrap_or_else(|| body.trim().to_string())
}

pub type Result<T> = std::result::Result<T, GenerationError>;
