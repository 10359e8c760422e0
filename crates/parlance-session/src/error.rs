use thiserror::Error;
use uuid::Uuid;

/// Reasons a session operation was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Chat history cannot change while a reply is in progress")]
    HistoryLocked,

    #[error("Unknown chat: {0}")]
    UnknownThread(Uuid),

    #[error("Could not store setting: {0}")]
    Storage(String),

    #[error("Session has shut down")]
    Closed,
}

pub type Result<T> = std::result::Result<T, SessionError>;
