use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{SessionPhase, UserId};

/// Broad origin of a request failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RequestErrorKind {
    /// The server answered with a non-2xx status.
    Status,
    /// The request never produced a response (connect, timeout, I/O).
    Transport,
    /// A 2xx response body did not match the expected shape.
    Decode,
}

/// Single error type produced by every API operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RequestError {
    pub kind: RequestErrorKind,
    /// HTTP status when the server answered.
    pub status: Option<u16>,
    /// Human-readable message shown inline in the affected panel.
    pub message: String,
}

impl RequestError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: RequestErrorKind::Status,
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: RequestErrorKind::Transport,
            status: None,
            message: message.into(),
        }
    }

    pub fn decode(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind: RequestErrorKind::Decode,
            status,
            message: message.into(),
        }
    }

    /// Generic message used when the error body carries nothing usable.
    pub fn generic_status(status: u16) -> Self {
        Self::status(status, format!("Request failed ({status})"))
    }
}

/// Errors returned by session flows.
///
/// Flows record the same failure in their scope's error slot before returning it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Request(#[from] RequestError),
    /// Message bodies must contain non-whitespace text.
    #[error("message body is empty")]
    EmptyMessage,
    #[error("invalid user id {0}: must be a positive integer")]
    InvalidUserId(UserId),
    #[error("cannot run '{action}' while session is {phase:?}")]
    InvalidState {
        phase: SessionPhase,
        action: &'static str,
    },
    /// The session was torn down; it accepts no further commands.
    #[error("session is shut down")]
    ShutDown,
}

impl SessionError {
    /// Build a standard invalid-state-transition error.
    pub fn invalid_state(phase: SessionPhase, action: &'static str) -> Self {
        Self::InvalidState { phase, action }
    }

    /// Text written into a scope's error slot, with a flow-specific fallback.
    pub fn scope_text(&self, fallback: &str) -> String {
        let text = self.to_string();
        if text.trim().is_empty() {
            fallback.to_owned()
        } else {
            text
        }
    }
}
