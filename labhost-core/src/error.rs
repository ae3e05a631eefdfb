//! Error types for the labhost core library.
//!
//! Console handlers report failures as a single `<kind>: <message>` line and
//! keep the read loop alive; background sessions log transient failures and
//! keep polling. Both behaviors key off [`HostError::kind`] and
//! [`HostError::is_transient`].

use thiserror::Error;
use tracing::{error, warn};

/// The main error type for host-controller operations.
#[derive(Debug, Error)]
pub enum HostError {
    /// Malformed command-line flags or invalid argument values.
    #[error("{0}")]
    Argument(String),

    /// Unknown session id, host index, or artifact key.
    #[error("{0}")]
    NotFound(String),

    /// An update session with the requested id is still running.
    #[error("{0}")]
    AlreadyRunning(String),

    /// Network or socket failure talking to a remote endpoint.
    #[error("{0}")]
    Transport(String),

    /// The endpoint responded but signalled an application-level failure.
    #[error("{endpoint} rejected request: {message}")]
    RemoteRejected { endpoint: String, message: String },

    /// An external tool (fastboot, adb, gsutil, suite binary) failed.
    #[error("{tool}: {message}")]
    Tool { tool: String, message: String },

    /// IO error.
    #[error("{0}")]
    Io(String),

    /// Serialization/deserialization error.
    #[error("{0}")]
    Serialization(String),

    /// Configuration error.
    #[error("{0}")]
    Config(String),

    /// Internal error (catch-all for unexpected conditions).
    #[error("{0}")]
    Internal(String),
}

/// Result type alias for host-controller operations.
pub type HostResult<T> = Result<T, HostError>;

impl HostError {
    /// Printable name of the error kind, used for `<kind>: <message>`
    /// console lines.
    pub fn kind(&self) -> &'static str {
        match self {
            HostError::Argument(_) => "ArgumentError",
            HostError::NotFound(_) => "NotFound",
            HostError::AlreadyRunning(_) => "AlreadyRunning",
            HostError::Transport(_) => "TransportError",
            HostError::RemoteRejected { .. } => "RemoteRejected",
            HostError::Tool { .. } => "ToolError",
            HostError::Io(_) => "IoError",
            HostError::Serialization(_) => "SerializationError",
            HostError::Config(_) => "ConfigError",
            HostError::Internal(_) => "InternalError",
        }
    }

    /// Returns true if the operation might succeed on a later attempt.
    ///
    /// Polling sessions swallow transient errors so a single bad cycle
    /// cannot kill a long-lived monitoring session.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HostError::Transport(_) | HostError::RemoteRejected { .. }
        )
    }

    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        HostError::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Log this error with severity matched to its transience.
    pub fn log(&self) {
        if self.is_transient() {
            warn!(kind = self.kind(), "transient error: {}", self);
        } else {
            error!(kind = self.kind(), "error: {}", self);
        }
    }
}

impl From<std::io::Error> for HostError {
    fn from(err: std::io::Error) -> Self {
        HostError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for HostError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            HostError::Serialization(err.to_string())
        } else {
            HostError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for HostError {
    fn from(err: serde_json::Error) -> Self {
        HostError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for HostError {
    fn from(err: toml::de::Error) -> Self {
        HostError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for HostError {
    fn from(err: config::ConfigError) -> Self {
        HostError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(HostError::Argument("bad flag".into()).kind(), "ArgumentError");
        assert_eq!(HostError::NotFound("session 7".into()).kind(), "NotFound");
        assert_eq!(
            HostError::AlreadyRunning("session 1".into()).kind(),
            "AlreadyRunning"
        );
        assert_eq!(
            HostError::Transport("connection refused".into()).kind(),
            "TransportError"
        );
        assert_eq!(
            HostError::RemoteRejected {
                endpoint: "job_queue/v1/get".into(),
                message: "FAIL".into(),
            }
            .kind(),
            "RemoteRejected"
        );
    }

    #[test]
    fn test_is_transient() {
        assert!(HostError::Transport("timeout".into()).is_transient());
        assert!(HostError::RemoteRejected {
            endpoint: "e".into(),
            message: "m".into(),
        }
        .is_transient());

        assert!(!HostError::Argument("bad".into()).is_transient());
        assert!(!HostError::NotFound("missing".into()).is_transient());
        assert!(!HostError::AlreadyRunning("dup".into()).is_transient());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: HostError = io_err.into();
        assert!(matches!(err, HostError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_remote_rejected_display() {
        let err = HostError::RemoteRejected {
            endpoint: "schedule_info/v1/set".into(),
            message: "return_code was FAIL".into(),
        };
        assert!(err.to_string().contains("schedule_info/v1/set"));
        assert!(err.to_string().contains("FAIL"));
    }
}
