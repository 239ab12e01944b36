//! Structured automation steps.
//!
//! Each variant is one primitive of the iTerm2 automation vocabulary. A
//! step list is serialized to JSON and interpreted by the fixed harness in
//! [`crate::harness`]; caller-supplied text only ever travels as JSON data.
//!
//! The harness keeps a "current session" register: `create_window`,
//! `find_session` and `split` set it, every other session-level step acts
//! on it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Open a window; writes `window_id`, `tab_id`, `session_id` and,
    /// when available, `frame`.
    CreateWindow {
        #[serde(skip_serializing_if = "Option::is_none")]
        profile: Option<String>,
    },
    /// Linear scan of every window/tab/session for `session_id`.
    FindSession { session_id: String },
    /// Split the current session; the new session becomes current and is
    /// written to `new_session_id`.
    Split {
        vertical: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        profile: Option<String>,
    },
    SendText { text: String },
    /// Channels in `0.0..=1.0`.
    SetTabColor { red: f64, green: f64, blue: f64 },
    /// Read a session-scope variable (`path`, `jobName`, ...) into `key`.
    ReadVariable { name: String, key: String },
    /// Store whether the shell is sitting at a prompt under `key`.
    ReadPromptState { key: String },
    /// Write the full `windows → tabs → sessions` listing to `windows`.
    ListSessions,
    /// Run nested steps, recording the outcome under `outcomes[key]`
    /// instead of failing the whole script.
    Isolated { key: String, steps: Vec<Step> },
}

impl Step {
    pub fn find_session(session_id: impl Into<String>) -> Self {
        Self::FindSession {
            session_id: session_id.into(),
        }
    }

    /// Send `text` as a command line: a trailing newline is added unless
    /// one is already present.
    pub fn send_line(text: &str) -> Self {
        let mut text = text.to_string();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        Self::SendText { text }
    }

    pub fn read_variable(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ReadVariable {
            name: name.into(),
            key: key.into(),
        }
    }

    pub fn op(&self) -> &'static str {
        match self {
            Self::CreateWindow { .. } => "create_window",
            Self::FindSession { .. } => "find_session",
            Self::Split { .. } => "split",
            Self::SendText { .. } => "send_text",
            Self::SetTabColor { .. } => "set_tab_color",
            Self::ReadVariable { .. } => "read_variable",
            Self::ReadPromptState { .. } => "read_prompt_state",
            Self::ListSessions => "list_sessions",
            Self::Isolated { .. } => "isolated",
        }
    }
}
