//! itermux-core: in-process window → tab → pane hierarchy.
//! Identifier allocation, entity records, the hierarchy tracker and tab
//! color parsing. No IO and no async: everything here is driven by the
//! dispatcher after an automation call has already succeeded.

pub mod color;
pub mod error;
pub mod ids;
pub mod model;
pub mod tracker;

pub use color::{TabColor, parse_color};
pub use error::TrackerError;
pub use ids::{EntityKind, PaneId, TabId, WindowId};
pub use model::{Frame, Pane, PaneDetails, Position, SplitDirection, Tab, Window};
pub use tracker::{HierarchyTracker, TabNode, TreeSnapshot, WindowNode, WindowSeed};
