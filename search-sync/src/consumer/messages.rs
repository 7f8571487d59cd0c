//! Change message wire format.
//!
//! One JSON object per line, discriminated by `kind`:
//!
//! ```text
//! {"kind":"created","entity_type":"customers","entity_id":"42","snapshot":{...}}
//! {"kind":"patched","entity_type":"customers","entity_id":"42","fields":{"status":"blocked"}}
//! ```

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use search_sync_shared::{ChangeKind, EntityChangeEvent};

use crate::errors::SyncError;

/// A decoded change message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeMessage<E> {
    Created {
        entity_type: String,
        entity_id: String,
        snapshot: E,
    },
    Updated {
        entity_type: String,
        entity_id: String,
        snapshot: E,
    },
    Deleted {
        entity_type: String,
        entity_id: String,
        snapshot: E,
    },
    /// Partial update of a few indexed fields, e.g. a status flip made by staff.
    Patched {
        entity_type: String,
        entity_id: String,
        fields: Value,
    },
}

/// What a message asks the propagator to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeAction<E> {
    Change(EntityChangeEvent<E>),
    Patch {
        entity_type: String,
        entity_id: String,
        fields: Value,
    },
}

impl<E: DeserializeOwned> ChangeMessage<E> {
    /// Decode one line.
    pub fn parse(line: &str) -> Result<Self, SyncError> {
        Ok(serde_json::from_str(line)?)
    }
}

impl<E> ChangeMessage<E> {
    pub fn entity_type(&self) -> &str {
        match self {
            Self::Created { entity_type, .. }
            | Self::Updated { entity_type, .. }
            | Self::Deleted { entity_type, .. }
            | Self::Patched { entity_type, .. } => entity_type,
        }
    }

    pub fn into_action(self) -> ChangeAction<E> {
        let change = |kind: ChangeKind, entity_type: String, entity_id: String, snapshot: E| {
            ChangeAction::Change(EntityChangeEvent::<E>::new(entity_type, entity_id, kind, snapshot))
        };
        match self {
            Self::Created {
                entity_type,
                entity_id,
                snapshot,
            } => change(ChangeKind::Created, entity_type, entity_id, snapshot),
            Self::Updated {
                entity_type,
                entity_id,
                snapshot,
            } => change(ChangeKind::Updated, entity_type, entity_id, snapshot),
            Self::Deleted {
                entity_type,
                entity_id,
                snapshot,
            } => change(ChangeKind::Deleted, entity_type, entity_id, snapshot),
            Self::Patched {
                entity_type,
                entity_id,
                fields,
            } => ChangeAction::Patch {
                entity_type,
                entity_id,
                fields,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use search_sync_shared::Customer;
    use serde_json::json;

    #[test]
    fn test_parse_created() {
        let line = json!({
            "kind": "created",
            "entity_type": "customers",
            "entity_id": "42",
            "snapshot": {
                "id": 42,
                "email": "ada@example.com",
                "created_at": "2024-01-02T03:04:05Z",
                "updated_at": "2024-01-02T03:04:05Z"
            }
        })
        .to_string();

        let message = ChangeMessage::<Customer>::parse(&line).unwrap();
        assert_eq!(message.entity_type(), "customers");

        match message.into_action() {
            ChangeAction::Change(event) => {
                assert_eq!(event.kind, ChangeKind::Created);
                assert_eq!(event.entity_id, "42");
                assert_eq!(event.snapshot.email, "ada@example.com");
            }
            other => panic!("expected change, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_patched() {
        let line = r#"{"kind":"patched","entity_type":"customers","entity_id":"7","fields":{"status":"blocked"}}"#;

        let message = ChangeMessage::<Customer>::parse(line).unwrap();

        assert_eq!(
            message.into_action(),
            ChangeAction::Patch {
                entity_type: "customers".to_string(),
                entity_id: "7".to_string(),
                fields: json!({ "status": "blocked" }),
            }
        );
    }

    #[test]
    fn test_parse_rejects_unknown_kind_and_garbage() {
        let unknown = r#"{"kind":"renamed","entity_type":"customers","entity_id":"7"}"#;
        assert!(matches!(
            ChangeMessage::<Customer>::parse(unknown),
            Err(SyncError::ParseError(_))
        ));
        assert!(ChangeMessage::<Customer>::parse("not json").is_err());
    }
}
