//! Append-only audit rows for governance transitions.
//!
//! The audit trail is the authoritative history; an entry's current fields
//! are a projection of it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::Identifiable;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditAction {
    Created,
    Updated,
    Confirmed,
    Adjusted,
    Deleted,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuditAction::Created => "Created",
            AuditAction::Updated => "Updated",
            AuditAction::Confirmed => "Confirmed",
            AuditAction::Adjusted => "Adjusted",
            AuditAction::Deleted => "Deleted",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// Single field-level change captured in an audit row.
pub struct FieldChange {
    pub field: String,
    pub before: Option<String>,
    pub after: Option<String>,
}

impl FieldChange {
    pub fn new(field: impl Into<String>, before: Option<String>, after: Option<String>) -> Self {
        Self {
            field: field.into(),
            before,
            after,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub case_id: Uuid,
    pub action: AuditAction,
    pub changes: Vec<FieldChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(entry_id: Uuid, case_id: Uuid, action: AuditAction, actor: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            entry_id,
            case_id,
            action,
            changes: Vec::new(),
            reason: None,
            actor: actor.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_changes(mut self, changes: Vec<FieldChange>) -> Self {
        self.changes = changes;
        self
    }
}

impl Identifiable for AuditLogEntry {
    fn id(&self) -> Uuid {
        self.id
    }
}
