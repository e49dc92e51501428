//! # Tracker Errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Domain level error type returned by the recorder.
#[derive(Error, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Error {
    /// The platform offers no position source. Fatal to starting a session.
    #[error("code: stream_unavailable, description: {0}")]
    StreamUnavailable(String),

    /// The requested transition is not valid from the current status.
    #[error("code: invalid_state, description: {0}")]
    InvalidState(String),

    /// A configuration value is out of range.
    #[error("code: invalid_config, description: {0}")]
    InvalidConfig(String),

    /// The session ended before a pending stop could complete.
    #[error("code: cancelled, description: {0}")]
    Cancelled(String),

    /// A non recoverable internal error occurred.
    #[error("code: server_error, description: {0}")]
    ServerError(String),
}

impl Error {
    /// Returns the error code.
    #[must_use]
    pub const fn code(&self) -> &str {
        match self {
            Self::StreamUnavailable(_) => "stream_unavailable",
            Self::InvalidState(_) => "invalid_state",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Cancelled(_) => "cancelled",
            Self::ServerError(_) => "server_error",
        }
    }

    /// Returns the error description.
    #[must_use]
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<Self>() {
            Some(Self::StreamUnavailable(e)) => Self::StreamUnavailable(format!("{err}: {e}")),
            Some(Self::InvalidState(e)) => Self::InvalidState(format!("{err}: {e}")),
            Some(Self::InvalidConfig(e)) => Self::InvalidConfig(format!("{err}: {e}")),
            Some(Self::Cancelled(e)) => Self::Cancelled(format!("{err}: {e}")),
            Some(Self::ServerError(e)) => Self::ServerError(format!("{err}: {e}")),
            None => {
                let stack = err.chain().fold(String::new(), |cause, e| format!("{cause} -> {e}"));
                let stack = stack.trim_start_matches(" -> ").to_string();
                Self::ServerError(stack)
            }
        }
    }
}

/// Stream-level failures reported by the position source.
///
/// These never end a session on their own. The display text is what the
/// snapshot carries in its `error` field.
#[derive(Error, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PositionError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable")]
    PositionUnavailable,

    #[error("Location request timeout")]
    Timeout,

    #[error("Unknown GPS error")]
    Unknown,
}
