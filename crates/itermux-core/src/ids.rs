//! Process-local identifiers: `window-N`, `tab-N`, `pane-N`.
//!
//! Identifiers are only ever minted by [`HierarchyTracker`](crate::HierarchyTracker)
//! from monotonic counters. They serialize as their display string so the
//! caller sees the same `pane-3` in JSON and in text responses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TrackerError;

/// The three levels of the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Window,
    Tab,
    Pane,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Window => "window",
            Self::Tab => "tab",
            Self::Pane => "pane",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! local_id {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            pub const KIND: EntityKind = $kind;

            pub fn new(n: u64) -> Self {
                Self(n)
            }

            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", Self::KIND, self.0)
            }
        }

        impl FromStr for $name {
            type Err = TrackerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .strip_prefix(Self::KIND.as_str())
                    .and_then(|rest| rest.strip_prefix('-'))
                    .and_then(|n| n.parse::<u64>().ok())
                    .map(Self)
                    .ok_or_else(|| TrackerError::InvalidId(s.to_string()))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

local_id!(
    /// Local identifier of a window (`window-N`).
    WindowId,
    EntityKind::Window
);
local_id!(
    /// Local identifier of a tab (`tab-N`).
    TabId,
    EntityKind::Tab
);
local_id!(
    /// Local identifier of a pane (`pane-N`).
    PaneId,
    EntityKind::Pane
);
