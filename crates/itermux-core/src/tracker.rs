//! Session hierarchy tracker: window → tab → pane.
//!
//! The tracker is the authoritative local view of what this process has
//! created through the automation API. It is mutated only after the
//! corresponding external call succeeded; nothing here talks to the
//! terminal.
//!
//! ## Identifiers
//!
//! One monotonic counter per kind. Counters never go backwards and ids are
//! never reused, including after removal.
//!
//! ## Default pane
//!
//! When a caller names no pane, the most recently created pane whose
//! active flag is set wins. `BTreeMap` ordering on [`PaneId`] makes this
//! deterministic.
//!
//! ## Reconciliation
//!
//! Terminals closed outside this process leave stale entries behind.
//! [`HierarchyTracker::reconcile`] prunes every pane whose session no
//! longer appears in a live listing, then drops emptied tabs and windows.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::color::TabColor;
use crate::error::TrackerError;
use crate::ids::{EntityKind, PaneId, TabId, WindowId};
use crate::model::{Frame, Pane, PaneDetails, Position, SplitDirection, Tab, Window};

/// What the automation API reported back after opening a window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowSeed {
    pub session_id: String,
    pub window_external_id: Option<String>,
    pub tab_external_id: Option<String>,
    pub title: Option<String>,
    pub frame: Option<Frame>,
}

#[derive(Debug, Default)]
pub struct HierarchyTracker {
    windows: BTreeMap<WindowId, Window>,
    tabs: BTreeMap<TabId, Tab>,
    panes: BTreeMap<PaneId, Pane>,
    next_window: u64,
    next_tab: u64,
    next_pane: u64,
}

impl HierarchyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Allocation ──────────────────────────────────────────────────

    /// Next raw counter value for `kind`. Strictly increasing, starts at 1.
    pub fn allocate(&mut self, kind: EntityKind) -> u64 {
        let counter = match kind {
            EntityKind::Window => &mut self.next_window,
            EntityKind::Tab => &mut self.next_tab,
            EntityKind::Pane => &mut self.next_pane,
        };
        *counter += 1;
        *counter
    }

    pub fn allocate_window_id(&mut self) -> WindowId {
        WindowId::new(self.allocate(EntityKind::Window))
    }

    pub fn allocate_tab_id(&mut self) -> TabId {
        TabId::new(self.allocate(EntityKind::Tab))
    }

    pub fn allocate_pane_id(&mut self) -> PaneId {
        PaneId::new(self.allocate(EntityKind::Pane))
    }

    // ─── Lookup ──────────────────────────────────────────────────────

    pub fn window(&self, id: WindowId) -> Result<&Window, TrackerError> {
        self.windows
            .get(&id)
            .ok_or_else(|| TrackerError::not_found(EntityKind::Window, id.to_string()))
    }

    pub fn tab(&self, id: TabId) -> Result<&Tab, TrackerError> {
        self.tabs
            .get(&id)
            .ok_or_else(|| TrackerError::not_found(EntityKind::Tab, id.to_string()))
    }

    pub fn pane(&self, id: PaneId) -> Result<&Pane, TrackerError> {
        self.panes
            .get(&id)
            .ok_or_else(|| TrackerError::not_found(EntityKind::Pane, id.to_string()))
    }

    /// Look up a pane by the caller-facing label (`pane-N`).
    ///
    /// Malformed labels are reported as not found: from the caller's side
    /// there is no difference between a typo and a pane that never existed.
    pub fn pane_by_label(&self, label: &str) -> Result<&Pane, TrackerError> {
        label
            .parse::<PaneId>()
            .ok()
            .and_then(|id| self.panes.get(&id))
            .ok_or_else(|| TrackerError::not_found(EntityKind::Pane, label))
    }

    pub fn pane_by_session(&self, session_id: &str) -> Option<&Pane> {
        self.panes.values().find(|p| p.session_id == session_id)
    }

    /// Most recently created pane with its active flag set.
    pub fn resolve_default_pane(&self) -> Result<&Pane, TrackerError> {
        self.panes
            .values()
            .rev()
            .find(|p| p.active)
            .ok_or(TrackerError::NoActivePane)
    }

    /// Panes in ascending id order.
    pub fn panes(&self) -> impl Iterator<Item = &Pane> {
        self.panes.values()
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn pane_count(&self) -> usize {
        self.panes.len()
    }

    // ─── Insertion ───────────────────────────────────────────────────

    pub fn insert_window(&mut self, window: Window) {
        self.windows.insert(window.id, window);
    }

    /// Add `tab` under an existing window. The first tab becomes active.
    pub fn insert_tab(&mut self, mut tab: Tab, under: WindowId) -> Result<(), TrackerError> {
        let window = self.windows.get_mut(&under).ok_or_else(|| {
            TrackerError::ParentMissing {
                kind: EntityKind::Window,
                id: under.to_string(),
            }
        })?;
        tab.window_id = under;
        window.tabs.push(tab.id);
        if window.active_tab.is_none() {
            window.active_tab = Some(tab.id);
        }
        self.tabs.insert(tab.id, tab);
        Ok(())
    }

    /// Add `pane` under an existing tab.
    ///
    /// An active pane demotes every other pane of the tab and becomes the
    /// tab's active pane.
    pub fn insert_pane(&mut self, mut pane: Pane, under: TabId) -> Result<(), TrackerError> {
        let tab = self
            .tabs
            .get_mut(&under)
            .ok_or_else(|| TrackerError::ParentMissing {
                kind: EntityKind::Tab,
                id: under.to_string(),
            })?;
        pane.tab_id = under;
        pane.window_id = tab.window_id;
        tab.panes.push(pane.id);
        if pane.active {
            for sibling in &tab.panes {
                if let Some(p) = self.panes.get_mut(sibling) {
                    p.active = false;
                }
            }
            tab.active_pane = Some(pane.id);
        } else if tab.active_pane.is_none() {
            tab.active_pane = Some(pane.id);
        }
        self.panes.insert(pane.id, pane);
        Ok(())
    }

    /// Record a freshly opened window with its single tab and pane.
    pub fn record_window(&mut self, seed: WindowSeed) -> (WindowId, TabId, PaneId) {
        let window_id = self.allocate_window_id();
        let tab_id = self.allocate_tab_id();
        let pane_id = self.allocate_pane_id();

        let mut window = Window::new(window_id, seed.window_external_id);
        window.title = seed.title;
        window.frame = seed.frame;
        window.tabs.push(tab_id);
        window.active_tab = Some(tab_id);

        let mut tab = Tab::new(tab_id, seed.tab_external_id);
        tab.window_id = window_id;
        tab.panes.push(pane_id);
        tab.active_pane = Some(pane_id);

        let mut pane = Pane::new(pane_id, seed.session_id, Position::default());
        pane.tab_id = tab_id;
        pane.window_id = window_id;

        self.windows.insert(window_id, window);
        self.tabs.insert(tab_id, tab);
        self.panes.insert(pane_id, pane);
        (window_id, tab_id, pane_id)
    }

    /// Record a pane split off from `source`. The new pane is active and
    /// sits one unit away from the source along the split axis.
    pub fn record_split(
        &mut self,
        source: PaneId,
        session_id: impl Into<String>,
        direction: SplitDirection,
    ) -> Result<PaneId, TrackerError> {
        let (tab_id, position) = {
            let src = self.pane(source)?;
            (src.tab_id, src.position.offset(direction))
        };
        let pane_id = self.allocate_pane_id();
        self.insert_pane(Pane::new(pane_id, session_id, position), tab_id)?;
        Ok(pane_id)
    }

    // ─── Updates ─────────────────────────────────────────────────────

    pub fn refresh_pane(&mut self, id: PaneId, details: PaneDetails) -> Result<(), TrackerError> {
        let pane = self
            .panes
            .get_mut(&id)
            .ok_or_else(|| TrackerError::not_found(EntityKind::Pane, id.to_string()))?;
        if details.title.is_some() {
            pane.title = details.title;
        }
        if details.working_directory.is_some() {
            pane.working_directory = details.working_directory;
        }
        if details.foreground_job.is_some() {
            pane.foreground_job = details.foreground_job;
        }
        Ok(())
    }

    pub fn set_tab_color(&mut self, id: TabId, color: TabColor) -> Result<(), TrackerError> {
        let tab = self
            .tabs
            .get_mut(&id)
            .ok_or_else(|| TrackerError::not_found(EntityKind::Tab, id.to_string()))?;
        tab.color = Some(color);
        Ok(())
    }

    // ─── Removal ─────────────────────────────────────────────────────

    /// Remove a pane. Emptied tabs and windows go with it; a removed
    /// active pane hands the role to the newest remaining sibling.
    pub fn remove_pane(&mut self, id: PaneId) -> Result<Pane, TrackerError> {
        let pane = self
            .panes
            .remove(&id)
            .ok_or_else(|| TrackerError::not_found(EntityKind::Pane, id.to_string()))?;

        let tab_now_empty = match self.tabs.get_mut(&pane.tab_id) {
            Some(tab) => {
                tab.panes.retain(|p| *p != id);
                if tab.active_pane == Some(id) {
                    tab.active_pane = tab.panes.last().copied();
                    if let Some(next) = tab.active_pane.and_then(|p| self.panes.get_mut(&p)) {
                        next.active = true;
                    }
                }
                tab.panes.is_empty()
            }
            None => false,
        };
        if tab_now_empty {
            self.remove_tab(pane.tab_id);
        }
        Ok(pane)
    }

    fn remove_tab(&mut self, id: TabId) {
        let Some(tab) = self.tabs.remove(&id) else {
            return;
        };
        let window_now_empty = match self.windows.get_mut(&tab.window_id) {
            Some(window) => {
                window.tabs.retain(|t| *t != id);
                if window.active_tab == Some(id) {
                    window.active_tab = window.tabs.last().copied();
                }
                window.tabs.is_empty()
            }
            None => false,
        };
        if window_now_empty {
            self.windows.remove(&tab.window_id);
        }
    }

    /// Drop every pane whose session is absent from `live_session_ids`.
    /// Returns the removed pane ids in ascending order.
    pub fn reconcile<'a, I>(&mut self, live_session_ids: I) -> Vec<PaneId>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let live: HashSet<&str> = live_session_ids.into_iter().collect();
        let stale: Vec<PaneId> = self
            .panes
            .values()
            .filter(|p| !live.contains(p.session_id.as_str()))
            .map(|p| p.id)
            .collect();
        stale
            .into_iter()
            .filter(|id| self.remove_pane(*id).is_ok())
            .collect()
    }

    // ─── Snapshot ────────────────────────────────────────────────────

    /// Serializable window → tab → pane tree.
    pub fn tree(&self) -> TreeSnapshot {
        let windows = self
            .windows
            .values()
            .map(|window| WindowNode {
                id: window.id,
                external_id: window.external_id.clone(),
                title: window.title.clone(),
                frame: window.frame,
                active_tab: window.active_tab,
                tabs: window
                    .tabs
                    .iter()
                    .filter_map(|t| self.tabs.get(t))
                    .map(|tab| TabNode {
                        id: tab.id,
                        external_id: tab.external_id.clone(),
                        color: tab.color,
                        active_pane: tab.active_pane,
                        panes: tab
                            .panes
                            .iter()
                            .filter_map(|p| self.panes.get(p))
                            .cloned()
                            .collect(),
                    })
                    .collect(),
            })
            .collect();
        TreeSnapshot { windows }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeSnapshot {
    pub windows: Vec<WindowNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowNode {
    pub id: WindowId,
    pub external_id: Option<String>,
    pub title: Option<String>,
    pub frame: Option<Frame>,
    pub active_tab: Option<TabId>,
    pub tabs: Vec<TabNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabNode {
    pub id: TabId,
    pub external_id: Option<String>,
    pub color: Option<TabColor>,
    pub active_pane: Option<PaneId>,
    pub panes: Vec<Pane>,
}
