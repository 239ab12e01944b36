//! Tool dispatcher: validate arguments, resolve panes, call the bridge,
//! then update the tracker.
//!
//! The tracker is touched only after the bridge call for an operation has
//! succeeded. Every failure is turned into an error [`ToolResult`] here so
//! nothing past this boundary has to handle it.

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use itermux_bridge::{AutomationBridge, BridgeError, Payload, Step, parse_listing};
use itermux_core::{
    Frame, HierarchyTracker, PaneDetails, PaneId, SplitDirection, TrackerError, WindowSeed,
    parse_color,
};

use crate::catalog::Tool;
use crate::monitor::{self, DEFAULT_DURATION_SECS, MonitorError};

// ─── Results and errors ──────────────────────────────────────────────

/// Text payload returned for every tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub text: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }

    /// `tools/call` result shape.
    pub fn to_json(&self) -> Value {
        json!({
            "content": [{"type": "text", "text": self.text}],
            "isError": self.is_error,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    Validation(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error("no valid panes")]
    NoValidPanes,

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("{0}\nchanges before failure:\n{changes}", changes = pretty(&.0.partial.entries))]
    Monitor(#[from] MonitorError),
}

impl ToolError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::UnknownTool(_) => "unknown_tool",
            Self::Tracker(_) | Self::NoValidPanes => "resolution",
            Self::Bridge(e) => e.category(),
            Self::Monitor(e) => e.source.category(),
        }
    }
}

// ─── Arguments ───────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct OpenTerminalArgs {
    profile: Option<String>,
    command: Option<String>,
    working_directory: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SplitArgs {
    pane_id: Option<String>,
    profile: Option<String>,
    command: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteArgs {
    pane_id: String,
    command: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaneArgs {
    pane_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionArgs {
    session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColorArgs {
    pane_id: String,
    color: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MonitorArgs {
    pane_id: String,
    #[serde(default = "default_monitor_duration")]
    duration: f64,
}

fn default_monitor_duration() -> f64 {
    DEFAULT_DURATION_SECS
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BroadcastArgs {
    pane_ids: Vec<String>,
    command: String,
}

/// Decode tool arguments. A missing (`null`) argument object counts as `{}`.
fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::Validation(e.to_string()))
}

fn require_command(command: &str) -> Result<&str, ToolError> {
    if command.trim().is_empty() {
        return Err(ToolError::Validation("command must not be empty".into()));
    }
    Ok(command)
}

/// Optional text argument; blank counts as absent.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

// ─── Payload helpers ─────────────────────────────────────────────────

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn optional_field(payload: &Payload, key: &str) -> Option<String> {
    payload.get(key).and_then(value_text).filter(|s| !s.is_empty())
}

fn required_field(payload: &Payload, key: &str) -> Result<String, ToolError> {
    optional_field(payload, key).ok_or_else(|| {
        ToolError::Bridge(BridgeError::Protocol(format!("bridge payload lacks `{key}`")))
    })
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| json!({"error": e.to_string()}).to_string())
}

const INFO_VARIABLES: &[&str] = &["name", "path", "jobName", "jobPid", "tty", "columns", "rows"];
const DETAIL_VARIABLES: &[&str] = &[
    "name", "path", "jobName", "jobPid", "tty", "columns", "rows", "hostname", "username",
];

fn variable_steps(session_id: &str, names: &[&str]) -> Vec<Step> {
    let mut steps = vec![Step::find_session(session_id)];
    steps.extend(names.iter().map(|name| Step::read_variable(*name, *name)));
    steps
}

fn details_from(payload: &Payload) -> PaneDetails {
    PaneDetails {
        title: optional_field(payload, "name"),
        working_directory: optional_field(payload, "path"),
        foreground_job: optional_field(payload, "jobName"),
    }
}

fn format_variables(out: &mut String, payload: &Payload, names: &[&str]) {
    for name in names {
        let value = optional_field(payload, name).unwrap_or_else(|| "(unset)".to_string());
        out.push_str(&format!("\n  {name}: {value}"));
    }
}

// ─── Dispatcher ──────────────────────────────────────────────────────

/// Owns the tracker and the bridge. One call runs end to end before the
/// next starts (`&mut self`), which serializes all tracker access.
pub struct ToolDispatcher<B> {
    bridge: B,
    tracker: HierarchyTracker,
    monitor_interval: Duration,
}

impl<B: AutomationBridge> ToolDispatcher<B> {
    pub fn new(bridge: B) -> Self {
        Self {
            bridge,
            tracker: HierarchyTracker::new(),
            monitor_interval: Duration::from_secs(1),
        }
    }

    pub fn with_monitor_interval(mut self, every: Duration) -> Self {
        self.monitor_interval = every;
        self
    }

    pub fn tracker(&self) -> &HierarchyTracker {
        &self.tracker
    }

    /// Run one tool. Never fails: errors come back as `Error: ...` text.
    pub async fn call(&mut self, name: &str, arguments: Value) -> ToolResult {
        let outcome = match Tool::from_name(name) {
            Some(tool) => self.dispatch(tool, arguments).await,
            None => Err(ToolError::UnknownTool(name.to_string())),
        };
        match outcome {
            Ok(text) => {
                tracing::info!(tool = name, "tool call ok");
                ToolResult::ok(text)
            }
            Err(e) => {
                tracing::info!(tool = name, kind = e.kind(), error = %e, "tool call failed");
                ToolResult::error(format!("Error: {e}"))
            }
        }
    }

    async fn dispatch(&mut self, tool: Tool, arguments: Value) -> Result<String, ToolError> {
        match tool {
            Tool::OpenTerminal => self.open_terminal(parse_args(arguments)?).await,
            Tool::SplitHorizontal => {
                self.split(SplitDirection::Horizontal, parse_args(arguments)?)
                    .await
            }
            Tool::SplitVertical => {
                self.split(SplitDirection::Vertical, parse_args(arguments)?)
                    .await
            }
            Tool::ExecuteCommand => self.execute_command(parse_args(arguments)?).await,
            Tool::GetSessionInfo => self.session_info(parse_args(arguments)?).await,
            Tool::GetSessionDetails => self.session_details(parse_args(arguments)?).await,
            Tool::SetTabColor => self.set_tab_color(parse_args(arguments)?).await,
            Tool::ListAllSessions => self.list_all_sessions().await,
            Tool::MonitorSession => self.monitor(parse_args(arguments)?).await,
            Tool::BroadcastInput => self.broadcast(parse_args(arguments)?).await,
            Tool::ListPanes => Ok(self.list_panes()),
            Tool::GetTerminalState => Ok(self.terminal_state()),
        }
    }

    // ─── Creation ────────────────────────────────────────────────────

    async fn open_terminal(&mut self, args: OpenTerminalArgs) -> Result<String, ToolError> {
        let mut steps = vec![Step::CreateWindow {
            profile: present(&args.profile).map(String::from),
        }];
        if let Some(dir) = present(&args.working_directory) {
            let quoted = shlex::try_quote(dir)
                .map_err(|e| ToolError::Validation(format!("workingDirectory: {e}")))?;
            steps.push(Step::send_line(&format!("cd {quoted}")));
        }
        if let Some(command) = present(&args.command) {
            steps.push(Step::send_line(command));
        }

        let payload = self.bridge.execute(&steps).await?;
        let session_id = required_field(&payload, "session_id")?;
        let frame = payload
            .get("frame")
            .and_then(|v| Frame::deserialize(v).ok());
        let (window_id, tab_id, pane_id) = self.tracker.record_window(WindowSeed {
            session_id: session_id.clone(),
            window_external_id: optional_field(&payload, "window_id"),
            tab_external_id: optional_field(&payload, "tab_id"),
            title: None,
            frame,
        });
        tracing::debug!(%window_id, %tab_id, %pane_id, session_id = %session_id, "window recorded");

        Ok(format!(
            "Opened {window_id} with {tab_id} and {pane_id} (session {session_id})"
        ))
    }

    async fn split(&mut self, direction: SplitDirection, args: SplitArgs) -> Result<String, ToolError> {
        let source = match present(&args.pane_id) {
            Some(label) => self.tracker.pane_by_label(label)?,
            None => self.tracker.resolve_default_pane()?,
        };
        let (source_id, source_session) = (source.id, source.session_id.clone());

        let mut steps = vec![
            Step::find_session(source_session),
            Step::Split {
                vertical: direction.is_vertical(),
                profile: present(&args.profile).map(String::from),
            },
        ];
        if let Some(command) = present(&args.command) {
            steps.push(Step::send_line(command));
        }

        let payload = self.bridge.execute(&steps).await?;
        let new_session = required_field(&payload, "new_session_id")?;
        let pane_id = self
            .tracker
            .record_split(source_id, new_session.clone(), direction)?;
        let position = self.tracker.pane(pane_id)?.position;

        Ok(format!(
            "Split {source_id} {}: created {pane_id} (session {new_session}) at ({}, {})",
            direction.as_str(),
            position.x,
            position.y
        ))
    }

    // ─── Input ───────────────────────────────────────────────────────

    async fn execute_command(&mut self, args: ExecuteArgs) -> Result<String, ToolError> {
        let command = require_command(&args.command)?;
        let pane = self.tracker.pane_by_label(&args.pane_id)?;
        let (pane_id, session_id) = (pane.id, pane.session_id.clone());

        self.bridge
            .execute(&[Step::find_session(session_id), Step::send_line(command)])
            .await?;
        Ok(format!("Sent command to {pane_id}: {}", command.trim_end()))
    }

    async fn broadcast(&mut self, args: BroadcastArgs) -> Result<String, ToolError> {
        let command = require_command(&args.command)?;

        let mut seen = HashSet::new();
        let mut targets: Vec<(PaneId, String)> = Vec::new();
        for label in &args.pane_ids {
            match self.tracker.pane_by_label(label) {
                Ok(pane) => {
                    if seen.insert(pane.id) {
                        targets.push((pane.id, pane.session_id.clone()));
                    }
                }
                Err(_) => tracing::debug!(label, "broadcast skips unknown pane"),
            }
        }
        if targets.is_empty() {
            return Err(ToolError::NoValidPanes);
        }

        let steps: Vec<Step> = targets
            .iter()
            .map(|(pane_id, session_id)| Step::Isolated {
                key: pane_id.to_string(),
                steps: vec![Step::find_session(session_id.clone()), Step::send_line(command)],
            })
            .collect();
        let payload = self.bridge.execute(&steps).await?;
        let outcomes = payload.get("outcomes").and_then(Value::as_object);

        let mut delivered = 0;
        let mut lines = Vec::with_capacity(targets.len());
        for (pane_id, session_id) in &targets {
            let outcome = outcomes.and_then(|o| o.get(&pane_id.to_string()));
            let ok = outcome
                .and_then(|o| o.get("ok"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if ok {
                delivered += 1;
                lines.push(format!("  {pane_id} ({session_id}): ok"));
            } else {
                let reason = outcome
                    .and_then(|o| o.get("error"))
                    .and_then(value_text)
                    .unwrap_or_else(|| "no outcome reported".to_string());
                lines.push(format!("  {pane_id} ({session_id}): failed: {reason}"));
            }
        }

        Ok(format!(
            "Broadcast to {delivered}/{} pane(s):\n{}",
            targets.len(),
            lines.join("\n")
        ))
    }

    // ─── Inspection ──────────────────────────────────────────────────

    async fn session_info(&mut self, args: PaneArgs) -> Result<String, ToolError> {
        let pane = self.tracker.pane_by_label(&args.pane_id)?;
        let (pane_id, session_id) = (pane.id, pane.session_id.clone());

        let payload = self
            .bridge
            .execute(&variable_steps(&session_id, INFO_VARIABLES))
            .await?;
        self.tracker.refresh_pane(pane_id, details_from(&payload))?;

        let mut text = format!("Session info for {pane_id} (session {session_id}):");
        format_variables(&mut text, &payload, INFO_VARIABLES);
        Ok(text)
    }

    async fn session_details(&mut self, args: SessionArgs) -> Result<String, ToolError> {
        let session_id = args.session_id.trim();
        if session_id.is_empty() {
            return Err(ToolError::Validation("sessionId must not be empty".into()));
        }

        let payload = self
            .bridge
            .execute(&variable_steps(session_id, DETAIL_VARIABLES))
            .await?;
        let local = self.tracker.pane_by_session(session_id).map(|p| p.id);
        if let Some(pane_id) = local {
            self.tracker.refresh_pane(pane_id, details_from(&payload))?;
        }

        let mut text = format!("Session details for {session_id}:");
        match local {
            Some(pane_id) => text.push_str(&format!("\n  localPaneId: {pane_id}")),
            None => text.push_str("\n  localPaneId: (not tracked)"),
        }
        format_variables(&mut text, &payload, DETAIL_VARIABLES);
        Ok(text)
    }

    async fn set_tab_color(&mut self, args: ColorArgs) -> Result<String, ToolError> {
        let pane = self.tracker.pane_by_label(&args.pane_id)?;
        let (pane_id, tab_id, session_id) = (pane.id, pane.tab_id, pane.session_id.clone());
        let color = parse_color(&args.color);

        self.bridge
            .execute(&[
                Step::find_session(session_id),
                Step::SetTabColor {
                    red: color.red,
                    green: color.green,
                    blue: color.blue,
                },
            ])
            .await?;
        self.tracker.set_tab_color(tab_id, color)?;

        Ok(format!(
            "Set color of {tab_id} (via {pane_id}) to ({:.2}, {:.2}, {:.2})",
            color.red, color.green, color.blue
        ))
    }

    async fn list_all_sessions(&mut self) -> Result<String, ToolError> {
        let payload = self.bridge.execute(&[Step::ListSessions]).await?;
        let windows = parse_listing(&payload)?;
        let pruned = self.tracker.reconcile(
            windows
                .iter()
                .flat_map(|w| w.sessions())
                .map(|s| s.session_id.as_str()),
        );
        if !pruned.is_empty() {
            tracing::info!(count = pruned.len(), "pruned panes with closed sessions");
        }

        let mut text = if windows.is_empty() {
            "No iTerm2 windows are open.".to_string()
        } else {
            format!("{} iTerm2 window(s):", windows.len())
        };
        for window in &windows {
            text.push_str(&format!("\nWindow {}", window.window_id));
            for tab in &window.tabs {
                text.push_str(&format!("\n  Tab {}", tab.tab_id));
                for session in &tab.sessions {
                    text.push_str(&format!("\n    {}", session.session_id));
                    if let Some(name) = &session.name {
                        text.push_str(&format!(" \"{name}\""));
                    }
                    if let Some(pane) = self.tracker.pane_by_session(&session.session_id) {
                        text.push_str(&format!(" [{}]", pane.id));
                    }
                }
            }
        }
        if !pruned.is_empty() {
            let ids: Vec<String> = pruned.iter().map(ToString::to_string).collect();
            text.push_str(&format!(
                "\nPruned {} stale pane(s): {}",
                pruned.len(),
                ids.join(", ")
            ));
        }
        Ok(text)
    }

    async fn monitor(&mut self, args: MonitorArgs) -> Result<String, ToolError> {
        let pane = self.tracker.pane_by_label(&args.pane_id)?;
        let (pane_id, session_id) = (pane.id, pane.session_id.clone());
        let duration = monitor::clamp_duration(args.duration);

        let report =
            monitor::monitor_session(&self.bridge, &session_id, duration, self.monitor_interval)
                .await?;
        if let Some(last) = report.last_snapshot() {
            self.tracker.refresh_pane(
                pane_id,
                PaneDetails {
                    title: None,
                    working_directory: last.working_directory.clone(),
                    foreground_job: last.foreground_job.clone(),
                },
            )?;
        }

        Ok(format!(
            "Monitored {pane_id} for {:.1}s: {} poll(s), {} change(s)\n{}",
            report.realized_secs,
            report.polls,
            report.changes(),
            pretty(&report.entries)
        ))
    }

    fn list_panes(&self) -> String {
        if self.tracker.pane_count() == 0 {
            return "No panes tracked.".to_string();
        }
        let mut text = format!("{} pane(s):", self.tracker.pane_count());
        for pane in self.tracker.panes() {
            text.push_str(&format!(
                "\n  {} {}/{} session {} at ({}, {}){}",
                pane.id,
                pane.window_id,
                pane.tab_id,
                pane.session_id,
                pane.position.x,
                pane.position.y,
                if pane.active { " active" } else { "" }
            ));
            if let Some(cwd) = &pane.working_directory {
                text.push_str(&format!(" cwd {cwd}"));
            }
        }
        text
    }

    fn terminal_state(&self) -> String {
        format!(
            "{} window(s), {} tab(s), {} pane(s)\n{}",
            self.tracker.window_count(),
            self.tracker.tab_count(),
            self.tracker.pane_count(),
            pretty(&self.tracker.tree())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedBridge;
    use itermux_core::TabColor;

    fn opened() -> Value {
        json!({
            "window_id": "pty-WIN",
            "tab_id": "4",
            "session_id": "w0t0p0:AAA",
            "frame": {"x": 0.0, "y": 0.0, "width": 800.0, "height": 600.0},
        })
    }

    /// Bridge whose first reply answers `open-terminal`.
    fn bridge() -> ScriptedBridge {
        ScriptedBridge::new().reply(opened())
    }

    async fn dispatcher_with_window(bridge: ScriptedBridge) -> ToolDispatcher<ScriptedBridge> {
        let mut d = ToolDispatcher::new(bridge);
        let result = d.call("open-terminal", json!({})).await;
        assert!(!result.is_error, "{}", result.text);
        d
    }

    #[tokio::test]
    async fn open_then_split_vertical_end_to_end() {
        let bridge = ScriptedBridge::new()
            .reply(opened())
            .reply(json!({"new_session_id": "w0t0p1:BBB"}));
        let mut d = ToolDispatcher::new(bridge);

        let result = d.call("open-terminal", json!({"command": "echo hi"})).await;
        assert!(!result.is_error, "{}", result.text);
        for needle in ["window-1", "tab-1", "pane-1", "w0t0p0:AAA"] {
            assert!(result.text.contains(needle), "{needle} missing: {}", result.text);
        }
        assert_eq!(d.tracker().window_count(), 1);
        assert_eq!(d.tracker().tab_count(), 1);
        assert_eq!(d.tracker().pane_count(), 1);
        let first = d.tracker().pane_by_label("pane-1").expect("pane-1");
        assert!(first.active);
        let window = d.tracker().window(first.window_id).expect("window");
        assert_eq!(window.tabs, vec![first.tab_id]);
        assert_eq!(window.frame.map(|f| f.width), Some(800.0));

        let result = d.call("split-terminal-vertical", json!({})).await;
        assert!(!result.is_error, "{}", result.text);
        assert!(result.text.contains("pane-2"));

        let source = d.tracker().pane_by_label("pane-1").expect("pane-1");
        let split = d.tracker().pane_by_label("pane-2").expect("pane-2");
        assert!(!source.active);
        assert!(split.active);
        assert_eq!(split.position.x, source.position.x + 1);
        assert_eq!(split.tab_id, source.tab_id);
        assert_eq!(split.window_id, source.window_id);

        let calls = d.bridge.calls();
        assert_eq!(
            calls[0],
            vec![Step::CreateWindow { profile: None }, Step::send_line("echo hi")]
        );
        assert_eq!(
            calls[1],
            vec![
                Step::find_session("w0t0p0:AAA"),
                Step::Split {
                    vertical: true,
                    profile: None
                }
            ]
        );
    }

    #[tokio::test]
    async fn split_horizontal_offsets_y() {
        let bridge = bridge().reply(json!({"new_session_id": "S2"}));
        let mut d = dispatcher_with_window(bridge).await;
        let result = d
            .call("split-terminal-horizontal", json!({"paneId": "pane-1"}))
            .await;
        assert!(!result.is_error, "{}", result.text);
        let split = d.tracker().pane_by_label("pane-2").expect("pane-2");
        assert_eq!((split.position.x, split.position.y), (0, 1));
    }

    #[tokio::test]
    async fn open_terminal_quotes_working_directory() {
        let mut d = ToolDispatcher::new(ScriptedBridge::new().reply(opened()));
        let result = d
            .call(
                "open-terminal",
                json!({"workingDirectory": "/tmp/my dir", "command": "ls"}),
            )
            .await;
        assert!(!result.is_error, "{}", result.text);
        let calls = d.bridge.calls();
        let Step::SendText { text } = &calls[0][1] else {
            panic!("expected send_text, got {:?}", calls[0][1]);
        };
        assert_eq!(
            shlex::split(text.trim_end()),
            Some(vec!["cd".to_string(), "/tmp/my dir".to_string()])
        );
        assert_eq!(calls[0][2], Step::send_line("ls"));
    }

    #[tokio::test]
    async fn open_terminal_without_session_is_protocol_error() {
        let mut d = ToolDispatcher::new(ScriptedBridge::new().reply(json!({"window_id": "w"})));
        let result = d.call("open-terminal", json!(null)).await;
        assert!(result.is_error);
        assert!(result.text.contains("session_id"));
        assert_eq!(d.tracker().pane_count(), 0);
    }

    #[tokio::test]
    async fn split_without_panes_reports_no_active_pane() {
        let mut d = ToolDispatcher::new(ScriptedBridge::new());
        let result = d.call("split-terminal-vertical", json!({})).await;
        assert!(result.is_error);
        assert_eq!(result.text, "Error: no active pane");
        assert!(d.bridge.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_pane_never_reaches_bridge() {
        let mut d = ToolDispatcher::new(ScriptedBridge::new());
        let result = d
            .call(
                "execute-command-in-pane",
                json!({"paneId": "pane-9", "command": "ls"}),
            )
            .await;
        assert!(result.is_error);
        assert!(result.text.contains("pane not found: pane-9"), "{}", result.text);
        assert!(d.bridge.calls().is_empty());
    }

    #[tokio::test]
    async fn validation_errors() {
        let mut d = ToolDispatcher::new(ScriptedBridge::new());
        let missing = d.call("execute-command-in-pane", json!({"paneId": "pane-1"})).await;
        assert!(missing.is_error);
        assert!(missing.text.starts_with("Error: invalid arguments"));

        let mut d = dispatcher_with_window(bridge()).await;
        let blank = d
            .call(
                "execute-command-in-pane",
                json!({"paneId": "pane-1", "command": "  "}),
            )
            .await;
        assert_eq!(blank.text, "Error: invalid arguments: command must not be empty");

        let unknown = d.call("close-terminal", json!({})).await;
        assert_eq!(unknown.text, "Error: unknown tool: close-terminal");
        assert_eq!(d.bridge.calls().len(), 1);
    }

    #[tokio::test]
    async fn execute_command_appends_newline() {
        let mut d = dispatcher_with_window(bridge()).await;
        let result = d
            .call(
                "execute-command-in-pane",
                json!({"paneId": "pane-1", "command": "make test"}),
            )
            .await;
        assert!(!result.is_error);
        assert_eq!(
            d.bridge.calls()[1],
            vec![
                Step::find_session("w0t0p0:AAA"),
                Step::SendText {
                    text: "make test\n".into()
                }
            ]
        );
    }

    #[tokio::test]
    async fn bridge_failure_becomes_error_result() {
        let bridge = bridge().fail(BridgeError::Domain {
            kind: "StepError".into(),
            message: "Session not found: w0t0p0:AAA".into(),
            traceback: None,
        });
        let mut d = dispatcher_with_window(bridge).await;
        let result = d
            .call(
                "execute-command-in-pane",
                json!({"paneId": "pane-1", "command": "ls"}),
            )
            .await;
        assert!(result.is_error);
        assert_eq!(result.text, "Error: Session not found: w0t0p0:AAA");
    }

    #[tokio::test]
    async fn broadcast_with_only_unknown_panes_fails() {
        let mut d = dispatcher_with_window(bridge()).await;
        let result = d
            .call(
                "broadcast-input",
                json!({"paneIds": ["pane-7", "nonsense"], "command": "ls"}),
            )
            .await;
        assert_eq!(result.text, "Error: no valid panes");
        assert_eq!(d.bridge.calls().len(), 1);
    }

    #[tokio::test]
    async fn broadcast_mixed_list_targets_known_panes_only() {
        let bridge = bridge()
            .reply(json!({"new_session_id": "w0t0p1:BBB"}))
            .reply(json!({"outcomes": {
                "pane-1": {"ok": true},
                "pane-2": {"ok": false, "error": "Session not found: w0t0p1:BBB"},
            }}));
        let mut d = dispatcher_with_window(bridge).await;
        d.call("split-terminal-vertical", json!({})).await;

        let result = d
            .call(
                "broadcast-input",
                json!({"paneIds": ["pane-1", "pane-42", "pane-2", "pane-1"], "command": "ls"}),
            )
            .await;
        assert!(!result.is_error, "{}", result.text);
        assert!(result.text.starts_with("Broadcast to 1/2 pane(s)"));
        assert!(result.text.contains("pane-1 (w0t0p0:AAA): ok"));
        assert!(result.text.contains("pane-2 (w0t0p1:BBB): failed: Session not found"));
        assert!(!result.text.contains("pane-42"));

        let calls = d.bridge.calls();
        let steps = &calls[2];
        assert_eq!(steps.len(), 2);
        assert_eq!(
            steps[0],
            Step::Isolated {
                key: "pane-1".into(),
                steps: vec![Step::find_session("w0t0p0:AAA"), Step::send_line("ls")],
            }
        );
    }

    #[tokio::test]
    async fn set_tab_color_stores_parsed_color() {
        let mut d = dispatcher_with_window(bridge()).await;
        let result = d
            .call("set-tab-color", json!({"paneId": "pane-1", "color": "#FF0000"}))
            .await;
        assert!(!result.is_error, "{}", result.text);
        let pane = d.tracker().pane_by_label("pane-1").expect("pane");
        let tab = d.tracker().tab(pane.tab_id).expect("tab");
        assert_eq!(tab.color, Some(TabColor::new(1.0, 0.0, 0.0)));
        assert_eq!(
            d.bridge.calls()[1][1],
            Step::SetTabColor {
                red: 1.0,
                green: 0.0,
                blue: 0.0
            }
        );

        d.call("set-tab-color", json!({"paneId": "pane-1", "color": "chartreuse"}))
            .await;
        let tab = d.tracker().tab(pane_tab(&d)).expect("tab");
        assert_eq!(tab.color, Some(TabColor::FALLBACK));
    }

    fn pane_tab(d: &ToolDispatcher<ScriptedBridge>) -> itermux_core::TabId {
        d.tracker().pane_by_label("pane-1").expect("pane").tab_id
    }

    #[tokio::test]
    async fn session_info_refreshes_cached_fields() {
        let bridge = bridge().reply(json!({
            "name": "zsh",
            "path": "/Users/dev/repo",
            "jobName": "vim",
            "jobPid": 4242,
            "columns": 120,
            "rows": 40,
        }));
        let mut d = dispatcher_with_window(bridge).await;
        let result = d.call("get-session-info", json!({"paneId": "pane-1"})).await;
        assert!(!result.is_error, "{}", result.text);
        assert!(result.text.contains("jobPid: 4242"));
        assert!(result.text.contains("tty: (unset)"));

        let pane = d.tracker().pane_by_label("pane-1").expect("pane");
        assert_eq!(pane.working_directory.as_deref(), Some("/Users/dev/repo"));
        assert_eq!(pane.foreground_job.as_deref(), Some("vim"));
        assert_eq!(pane.title.as_deref(), Some("zsh"));
    }

    #[tokio::test]
    async fn session_details_reports_local_pane() {
        let bridge = bridge()
            .reply(json!({"path": "/tmp", "hostname": "mac"}))
            .reply(json!({"path": "/elsewhere"}));
        let mut d = dispatcher_with_window(bridge).await;

        let tracked = d
            .call("get-session-details", json!({"sessionId": "w0t0p0:AAA"}))
            .await;
        assert!(tracked.text.contains("localPaneId: pane-1"));
        assert!(tracked.text.contains("hostname: mac"));
        let pane = d.tracker().pane_by_label("pane-1").expect("pane");
        assert_eq!(pane.working_directory.as_deref(), Some("/tmp"));

        let foreign = d
            .call("get-session-details", json!({"sessionId": "w9t9p9:ZZZ"}))
            .await;
        assert!(!foreign.is_error);
        assert!(foreign.text.contains("localPaneId: (not tracked)"));
        assert_eq!(d.bridge.calls()[2][0], Step::find_session("w9t9p9:ZZZ"));
    }

    #[tokio::test]
    async fn list_all_sessions_prunes_closed_panes() {
        let bridge = bridge()
            .reply(json!({"new_session_id": "w0t0p1:BBB"}))
            .reply(json!({"windows": [
                {"window_id": "pty-WIN", "tabs": [
                    {"tab_id": "4", "sessions": [
                        {"session_id": "w0t0p1:BBB", "name": "zsh"},
                        {"session_id": "w0t0p2:CCC", "name": null},
                    ]},
                ]},
            ]}));
        let mut d = dispatcher_with_window(bridge).await;
        d.call("split-terminal-vertical", json!({})).await;

        let result = d.call("list-all-sessions", json!({})).await;
        assert!(!result.is_error, "{}", result.text);
        assert!(result.text.contains("w0t0p1:BBB \"zsh\" [pane-2]"));
        assert!(result.text.contains("w0t0p2:CCC"));
        assert!(result.text.contains("Pruned 1 stale pane(s): pane-1"));
        assert_eq!(d.tracker().pane_count(), 1);
        assert!(d.tracker().pane_by_label("pane-1").is_err());
    }

    #[tokio::test]
    async fn list_all_sessions_with_nothing_open() {
        let mut d = dispatcher_with_window(bridge().reply(json!({"windows": []})))
            .await;
        let result = d.call("list-all-sessions", json!({})).await;
        assert!(result.text.starts_with("No iTerm2 windows are open."));
        assert_eq!(d.tracker().window_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn monitor_session_reports_changes_and_refreshes() {
        let bridge = bridge()
            .reply(json!({"cwd": "/repo", "job": "zsh", "at_prompt": true}))
            .reply(json!({"cwd": "/repo/src", "job": "zsh", "at_prompt": true}));
        let mut d = dispatcher_with_window(bridge).await;
        let result = d
            .call("monitor-session", json!({"paneId": "pane-1", "duration": 2}))
            .await;
        assert!(!result.is_error, "{}", result.text);
        assert!(result.text.contains("2 poll(s), 1 change(s)"), "{}", result.text);
        assert!(result.text.contains("\"workingDirectory\": \"/repo/src\""));
        let pane = d.tracker().pane_by_label("pane-1").expect("pane");
        assert_eq!(pane.working_directory.as_deref(), Some("/repo/src"));
    }

    #[tokio::test(start_paused = true)]
    async fn monitor_failure_keeps_changes_seen_so_far() {
        let bridge = bridge()
            .reply(json!({"cwd": "/repo", "job": "zsh", "at_prompt": true}))
            .fail(BridgeError::Connection("iTerm2 went away".into()));
        let mut d = dispatcher_with_window(bridge).await;
        let result = d
            .call("monitor-session", json!({"paneId": "pane-1", "duration": 5}))
            .await;
        assert!(result.is_error);
        assert!(
            result
                .text
                .starts_with("Error: monitoring stopped after 1 poll(s): cannot connect to iTerm2: iTerm2 went away"),
            "{}",
            result.text
        );
        assert!(result.text.contains("changes before failure:"));
        assert!(result.text.contains("\"workingDirectory\": \"/repo\""));
        let pane = d.tracker().pane_by_label("pane-1").expect("pane");
        assert_eq!(pane.working_directory, None);
    }

    #[test]
    fn monitor_error_kind_follows_failed_poll() {
        let err = ToolError::from(MonitorError {
            partial: monitor::MonitorReport {
                requested_secs: 5.0,
                realized_secs: 1.0,
                polls: 1,
                entries: Vec::new(),
            },
            source: BridgeError::Timeout {
                after: Duration::from_secs(30),
            },
        });
        assert_eq!(err.kind(), "timeout");
    }

    #[tokio::test]
    async fn list_panes_and_terminal_state_are_local() {
        let mut d = ToolDispatcher::new(ScriptedBridge::new());
        assert_eq!(d.call("list-panes", json!({})).await.text, "No panes tracked.");

        let mut d = dispatcher_with_window(bridge()).await;
        let panes = d.call("list-panes", json!({})).await;
        assert!(panes.text.contains("pane-1 window-1/tab-1 session w0t0p0:AAA at (0, 0) active"));

        let state = d.call("get-terminal-state", json!({})).await;
        assert!(state.text.starts_with("1 window(s), 1 tab(s), 1 pane(s)"));
        assert!(state.text.contains("\"sessionId\": \"w0t0p0:AAA\""));
        assert_eq!(d.bridge.calls().len(), 1);
    }

    #[test]
    fn tool_result_json_shape() {
        let value = ToolResult::error("Error: no valid panes").to_json();
        assert_eq!(value["isError"], true);
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][0]["text"], "Error: no valid panes");
    }
}
