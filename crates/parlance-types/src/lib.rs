//! Chat domain types shared across the Parlance crates.

pub mod message;
pub mod status;
pub mod thread;

pub use message::{to_contents, Message, Role};
pub use parlance_llm::SafetyPreset;
pub use status::ConnectionStatus;
pub use thread::{
    derive_preview, derive_title, normalize_whitespace, truncate_chars, Thread, ThreadSummary,
    EMPTY_PREVIEW, NEW_CHAT_TITLE, PREVIEW_MAX_CHARS, TITLE_MAX_CHARS,
};
