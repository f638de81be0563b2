use std::time::Duration;

use engine::{EngineError, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The service rejected the call with a known error kind.
    #[error("{message}")]
    Api { kind: ErrorKind, message: String },
    #[error("missing or invalid caller id")]
    Unauthorized,
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
    #[error("server error: {0}")]
    Server(String),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// The service error kind behind this error, if any.
    ///
    /// Timeouts and transport failures count as `StoreUnavailable`.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Api { kind, .. } => Some(*kind),
            Self::Timeout(_) | Self::Transport(_) => Some(ErrorKind::StoreUnavailable),
            Self::Unauthorized | Self::Server(_) => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_some_and(ErrorKind::is_retryable)
    }
}

impl From<EngineError> for ClientError {
    fn from(value: EngineError) -> Self {
        Self::Api {
            kind: value.kind(),
            message: value.to_string(),
        }
    }
}
