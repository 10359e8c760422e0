//! Gemini generation client.
//!
//! Wire types, a tolerant SSE decoder, the incremental text merger and the
//! [`GenerationClient`] trait with its HTTP implementation [`GeminiClient`].

pub mod buffer_utils;
pub mod config;
pub mod error;
pub mod gemini;
pub mod merge;
pub mod streaming;
pub mod traits;
pub mod types;

pub use traits::{
    pick_model, GenerateRequest, GenerationClient, ModelResolution, DEFAULT_MODEL, MODEL_PRIORITY,
};

pub use buffer_utils::{parse_sse_text_stream, CircularLineBuffer, SseTextDecoder};
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use error::{api_error_message, GenerationError, Result};
pub use gemini::GeminiClient;
pub use merge::{merge_all, merge_text};
pub use streaming::{StreamChunk, TextStream};
pub use types::{Content, ContentRole, Part, SafetyPreset, SafetySetting, SystemInstruction};
