use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A person known to the local store. `email` is the identity key used by
/// the matcher; it is stored trimmed and lowercased.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub organization_id: Option<Uuid>,
    pub notes: Option<String>,
    pub last_contacted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a later source may fill in on an existing contact. `None` means
/// "leave alone"; a non-empty existing column is never overwritten.
#[derive(Debug, Clone, Default)]
pub struct ContactPatch {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub organization_id: Option<Uuid>,
    pub notes: Option<String>,
}

impl ContactPatch {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.phone.is_none()
            && self.organization_id.is_none()
            && self.notes.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub domain: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Email,
    Meeting,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Meeting => "meeting",
        }
    }
}

impl FromStr for InteractionKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "email" => Ok(Self::Email),
            "meeting" => Ok(Self::Meeting),
            _ => Err(format!("unknown interaction kind: {value}")),
        }
    }
}

/// One imported external record. `occurred_at` comes from the external
/// record, never from import time. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub kind: InteractionKind,
    pub occurred_at: DateTime<Utc>,
    pub note: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
