//! Entity lifecycle events.
//!
//! The primary store publishes one event per committed create, update or delete.

use serde::{Deserialize, Serialize};

/// Kind of change committed to the primary store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// A lifecycle notification for a single entity.
///
/// `snapshot` is the entity as committed; for deletes it is the last state
/// before removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityChangeEvent<E> {
    /// Logical entity type, e.g. `customers`.
    pub entity_type: String,
    /// Primary-store identifier of the entity.
    pub entity_id: String,
    pub kind: ChangeKind,
    pub snapshot: E,
}

impl<E> EntityChangeEvent<E> {
    /// Create a new event.
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        kind: ChangeKind,
        snapshot: E,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            kind,
            snapshot,
        }
    }

    /// Create a `created` event.
    pub fn created(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        snapshot: E,
    ) -> Self {
        Self::new(entity_type, entity_id, ChangeKind::Created, snapshot)
    }

    /// Create an `updated` event.
    pub fn updated(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        snapshot: E,
    ) -> Self {
        Self::new(entity_type, entity_id, ChangeKind::Updated, snapshot)
    }

    /// Create a `deleted` event.
    pub fn deleted(
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        snapshot: E,
    ) -> Self {
        Self::new(entity_type, entity_id, ChangeKind::Deleted, snapshot)
    }
}
