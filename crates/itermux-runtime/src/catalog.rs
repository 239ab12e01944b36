//! Tool names, descriptions and JSON input schemas.

use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    OpenTerminal,
    SplitHorizontal,
    SplitVertical,
    ExecuteCommand,
    GetSessionInfo,
    GetSessionDetails,
    SetTabColor,
    ListAllSessions,
    MonitorSession,
    BroadcastInput,
    ListPanes,
    GetTerminalState,
}

impl Tool {
    pub const ALL: [Self; 12] = [
        Self::OpenTerminal,
        Self::SplitHorizontal,
        Self::SplitVertical,
        Self::ExecuteCommand,
        Self::GetSessionInfo,
        Self::GetSessionDetails,
        Self::SetTabColor,
        Self::ListAllSessions,
        Self::MonitorSession,
        Self::BroadcastInput,
        Self::ListPanes,
        Self::GetTerminalState,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::OpenTerminal => "open-terminal",
            Self::SplitHorizontal => "split-terminal-horizontal",
            Self::SplitVertical => "split-terminal-vertical",
            Self::ExecuteCommand => "execute-command-in-pane",
            Self::GetSessionInfo => "get-session-info",
            Self::GetSessionDetails => "get-session-details",
            Self::SetTabColor => "set-tab-color",
            Self::ListAllSessions => "list-all-sessions",
            Self::MonitorSession => "monitor-session",
            Self::BroadcastInput => "broadcast-input",
            Self::ListPanes => "list-panes",
            Self::GetTerminalState => "get-terminal-state",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::OpenTerminal => {
                "Open a new iTerm2 window, optionally with a profile, a working directory and a command to run"
            }
            Self::SplitHorizontal => {
                "Split a pane with a horizontal divider (new pane below). Defaults to the active pane"
            }
            Self::SplitVertical => {
                "Split a pane with a vertical divider (new pane to the right). Defaults to the active pane"
            }
            Self::ExecuteCommand => "Send a command line to a pane",
            Self::GetSessionInfo => {
                "Read name, working directory, foreground job and size of a pane's session"
            }
            Self::GetSessionDetails => "Read session details by iTerm2 session id",
            Self::SetTabColor => {
                "Color the tab that holds a pane (#RRGGBB or red, green, blue, yellow, purple, cyan, orange, pink)"
            }
            Self::ListAllSessions => {
                "List every iTerm2 window, tab and session and prune panes whose session is gone"
            }
            Self::MonitorSession => {
                "Poll a pane's working directory, foreground job and prompt state once per interval and report changes"
            }
            Self::BroadcastInput => "Send the same command line to several panes",
            Self::ListPanes => "List panes created through this server",
            Self::GetTerminalState => "Show the tracked window, tab and pane tree",
        }
    }

    pub fn input_schema(self) -> Value {
        let pane_id = json!({"type": "string", "description": "Local pane id, e.g. pane-1"});
        let profile = json!({"type": "string", "description": "iTerm2 profile name"});
        let command = json!({"type": "string", "description": "Command line to run"});
        match self {
            Self::OpenTerminal => json!({
                "type": "object",
                "properties": {
                    "profile": profile,
                    "command": command,
                    "workingDirectory": {"type": "string", "description": "Directory to cd into first"},
                },
            }),
            Self::SplitHorizontal | Self::SplitVertical => json!({
                "type": "object",
                "properties": {
                    "paneId": pane_id,
                    "profile": profile,
                    "command": command,
                },
            }),
            Self::ExecuteCommand => json!({
                "type": "object",
                "properties": {"paneId": pane_id, "command": command},
                "required": ["paneId", "command"],
            }),
            Self::GetSessionInfo => json!({
                "type": "object",
                "properties": {"paneId": pane_id},
                "required": ["paneId"],
            }),
            Self::GetSessionDetails => json!({
                "type": "object",
                "properties": {
                    "sessionId": {"type": "string", "description": "iTerm2 session id"},
                },
                "required": ["sessionId"],
            }),
            Self::SetTabColor => json!({
                "type": "object",
                "properties": {
                    "paneId": pane_id,
                    "color": {"type": "string", "description": "#RRGGBB or a color name"},
                },
                "required": ["paneId", "color"],
            }),
            Self::MonitorSession => json!({
                "type": "object",
                "properties": {
                    "paneId": pane_id,
                    "duration": {
                        "type": "number",
                        "description": "Seconds to monitor (1-300)",
                        "default": 10,
                    },
                },
                "required": ["paneId"],
            }),
            Self::BroadcastInput => json!({
                "type": "object",
                "properties": {
                    "paneIds": {"type": "array", "items": {"type": "string"}},
                    "command": command,
                },
                "required": ["paneIds", "command"],
            }),
            Self::ListAllSessions | Self::ListPanes | Self::GetTerminalState => json!({
                "type": "object",
                "properties": {},
            }),
        }
    }
}

/// Catalog entries for `tools/list`.
pub fn catalog() -> Value {
    Value::Array(
        Tool::ALL
            .into_iter()
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "inputSchema": tool.input_schema(),
                })
            })
            .collect(),
    )
}
