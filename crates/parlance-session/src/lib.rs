//! Chat session engine for Parlance.
//!
//! A [`SessionHandle`] fronts a single actor task that owns the chat
//! history, runs one reply at a time through the [`Orchestrator`] and keeps
//! storage in step with a debounced writer.

mod actor;
pub mod builder;
pub mod config;
pub mod connection;
pub mod debounce;
pub mod error;
pub mod handle;
pub mod orchestrator;
pub mod pacing;
pub mod snapshot;
pub mod state;

pub use builder::SessionBuilder;
pub use config::{SessionConfig, DEFAULT_PERSIST_DEBOUNCE, FULL_REPLY_RATE};
pub use connection::{ConnectionTracker, PendingCheck};
pub use debounce::Debouncer;
pub use error::{Result, SessionError};
pub use handle::SessionHandle;
pub use orchestrator::{Orchestrator, ReplySink, SendReport, PROMPT_DROPPED_NOTICE};
pub use pacing::{animate, chunk_delay, chunk_size_for_rate, RateEstimator, INITIAL_RATE};
pub use snapshot::SessionSnapshot;
pub use state::SessionState;
