//! Error types for the automation bridge.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to start bridge interpreter: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("bridge io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bridge timed out after {}s", .after.as_secs_f64())]
    Timeout { after: Duration },

    #[error("bridge exited with code {}: {stderr}", .code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    ExitStatus { code: Option<i32>, stderr: String },

    #[error("bridge protocol error: {0}")]
    Protocol(String),

    #[error("cannot connect to iTerm2: {0}")]
    Connection(String),

    #[error("{message}")]
    Domain {
        kind: String,
        message: String,
        traceback: Option<String>,
    },
}

impl BridgeError {
    /// Taxonomy bucket used in logs and error responses.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Spawn(_) | Self::Io(_) | Self::ExitStatus { .. } | Self::Connection(_) => {
                "infrastructure"
            }
            Self::Timeout { .. } => "timeout",
            Self::Protocol(_) => "protocol",
            Self::Domain { .. } => "domain",
        }
    }
}
