//! Error types for the hierarchy tracker.

use thiserror::Error;

use crate::ids::EntityKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("no active pane")]
    NoActivePane,

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("parent {kind} does not exist: {id}")]
    ParentMissing { kind: EntityKind, id: String },
}

impl TrackerError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}
