use std::fmt;

/// Whether the configured API key has been verified against the model list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    NotConfigured,
    NotChecked,
    Checking,
    Connected { model_count: usize },
    Failed { message: String },
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured => write!(f, "No API key"),
            Self::NotChecked => write!(f, "Not checked"),
            Self::Checking => write!(f, "Checking..."),
            Self::Connected { model_count: 1 } => write!(f, "Connected (1 model)"),
            Self::Connected { model_count } => write!(f, "Connected ({model_count} models)"),
            Self::Failed { message } => write!(f, "Connection failed: {message}"),
        }
    }
}
