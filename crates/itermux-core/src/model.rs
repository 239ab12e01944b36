//! Window, tab and pane records held by the tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::color::TabColor;
use crate::ids::{PaneId, TabId, WindowId};

// ─── Layout ──────────────────────────────────────────────────────────

/// Logical position of a pane inside its tab.
///
/// Advisory bookkeeping only: splits offset the new pane by one unit along
/// the split axis. It is not the terminal's real geometry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Position of a pane split off from `self` in `direction`.
    pub fn offset(self, direction: SplitDirection) -> Self {
        match direction {
            SplitDirection::Vertical => Self::new(self.x + 1, self.y),
            SplitDirection::Horizontal => Self::new(self.x, self.y + 1),
        }
    }
}

/// Orientation of the divider a split creates.
///
/// A vertical divider places the new pane beside the source (x axis), a
/// horizontal divider places it below (y axis).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitDirection {
    Horizontal,
    Vertical,
}

impl SplitDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Self::Vertical)
    }
}

/// Window frame as reported by the terminal, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

// ─── Entities ────────────────────────────────────────────────────────

/// A single terminal surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pane {
    pub id: PaneId,
    /// Automation API session identifier. Set once at creation; the only
    /// key ever sent to the external API.
    pub session_id: String,
    pub tab_id: TabId,
    pub window_id: WindowId,
    pub position: Position,
    pub active: bool,
    pub title: Option<String>,
    pub working_directory: Option<String>,
    pub foreground_job: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Pane {
    /// A fresh pane record. Parent ids are filled in on insertion.
    pub fn new(id: PaneId, session_id: impl Into<String>, position: Position) -> Self {
        Self {
            id,
            session_id: session_id.into(),
            tab_id: TabId::new(0),
            window_id: WindowId::new(0),
            position,
            active: true,
            title: None,
            working_directory: None,
            foreground_job: None,
            created_at: Utc::now(),
        }
    }
}

/// Cached advisory fields refreshed from the terminal on demand.
/// `None` leaves the cached value untouched.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PaneDetails {
    pub title: Option<String>,
    pub working_directory: Option<String>,
    pub foreground_job: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    pub window_id: WindowId,
    /// Automation API tab identifier, when the terminal reported one.
    pub external_id: Option<String>,
    pub panes: Vec<PaneId>,
    pub active_pane: Option<PaneId>,
    pub color: Option<TabColor>,
}

impl Tab {
    pub fn new(id: TabId, external_id: Option<String>) -> Self {
        Self {
            id,
            window_id: WindowId::new(0),
            external_id,
            panes: Vec::new(),
            active_pane: None,
            color: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    pub id: WindowId,
    /// Automation API window identifier, when the terminal reported one.
    pub external_id: Option<String>,
    pub tabs: Vec<TabId>,
    pub active_tab: Option<TabId>,
    pub title: Option<String>,
    pub frame: Option<Frame>,
}

impl Window {
    pub fn new(id: WindowId, external_id: Option<String>) -> Self {
        Self {
            id,
            external_id,
            tabs: Vec::new(),
            active_tab: None,
            title: None,
            frame: None,
        }
    }
}
