//! Live window/tab/session listing reported by the `list_sessions` step.

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::executor::Payload;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LiveSession {
    pub session_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LiveTab {
    pub tab_id: String,
    #[serde(default)]
    pub sessions: Vec<LiveSession>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LiveWindow {
    pub window_id: String,
    #[serde(default)]
    pub tabs: Vec<LiveTab>,
}

impl LiveWindow {
    pub fn sessions(&self) -> impl Iterator<Item = &LiveSession> {
        self.tabs.iter().flat_map(|t| t.sessions.iter())
    }
}

/// Parse the `windows` field of a `list_sessions` payload.
///
/// A missing field means no windows are open.
pub fn parse_listing(payload: &Payload) -> Result<Vec<LiveWindow>, BridgeError> {
    match payload.get("windows") {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| BridgeError::Protocol(format!("malformed session listing: {e}"))),
    }
}
