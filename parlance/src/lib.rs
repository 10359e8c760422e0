//! # Parlance
//!
//! Streaming Gemini chat for Rust.
//!
//! - **Streaming replies** decoded from server-sent events and revealed at
//!   the pace they arrive
//! - **Recovery** from models that reject system prompts, models that are no
//!   longer served and broken streams
//! - **Local history** of chat threads, written atomically
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parlance::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let chat = ChatBuilder::new()
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .in_memory()
//!         .build()
//!         .await?;
//!
//!     let reply = chat.ask("What is the capital of Brazil?").await?;
//!     println!("{reply}");
//!
//!     chat.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Watching a reply as it streams
//!
//! ```rust,no_run
//! use parlance::prelude::*;
//!
//! # async fn example(chat: Chat) -> anyhow::Result<()> {
//! let mut updates = chat.session().subscribe();
//! chat.session().send_message("Explain Rust ownership").await?;
//!
//! while updates.changed().await.is_ok() {
//!     let snapshot = updates.borrow_and_update().clone();
//!     println!("{}", snapshot.last_reply().unwrap_or_default());
//!     if !snapshot.is_sending {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **parlance-llm**: Gemini wire types, SSE decoding and the HTTP client
//! - **parlance-types**: Messages, threads and connection status
//! - **parlance-persist**: Thread history, preferences and the API key on disk
//! - **parlance-session**: The session actor, pacing and retry orchestration

pub use parlance_llm as llm;
pub use parlance_persist as persist;
pub use parlance_session as session;
pub use parlance_types as types;

pub use parlance_llm::{
    ClientConfig, Content, GeminiClient, GenerateRequest, GenerationClient, GenerationError,
    SafetyPreset, DEFAULT_MODEL,
};
pub use parlance_persist::{PersistClient, PersistError};
pub use parlance_session::{
    SessionBuilder, SessionConfig, SessionError, SessionHandle, SessionSnapshot,
};
pub use parlance_types::{ConnectionStatus, Message, Role, Thread, ThreadSummary};

/// High-level builder for one-call chat
pub mod builder;

pub use builder::{Chat, ChatBuilder};

/// Convenient prelude with commonly used types
pub mod prelude {
    pub use crate::builder::{Chat, ChatBuilder};
    pub use crate::llm::SafetyPreset;
    pub use crate::session::{SessionHandle, SessionSnapshot};
    pub use crate::types::{Message, Thread};
    pub use anyhow::Result;
}
