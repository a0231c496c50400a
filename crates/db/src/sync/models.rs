use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Syncing => "syncing",
            Self::Error => "error",
        }
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "idle" => Ok(Self::Idle),
            "syncing" => Ok(Self::Syncing),
            "error" => Ok(Self::Error),
            _ => Err(format!("unknown sync status: {value}")),
        }
    }
}

/// Per-source resumption point of truth. One row per source name; created
/// lazily on the first sync attempt and never deleted. Cursor and
/// `last_synced_at` survive an error transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    pub id: Uuid,
    pub source: String,
    pub status: SyncStatus,
    pub cursor: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Contact,
    Organization,
    Interaction,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Organization => "organization",
            Self::Interaction => "interaction",
        }
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "contact" => Ok(Self::Contact),
            "organization" => Ok(Self::Organization),
            "interaction" => Ok(Self::Interaction),
            _ => Err(format!("unknown entity type: {value}")),
        }
    }
}

/// One successfully applied external record. Unique on (source,
/// external_id); never updated or deleted by the sync subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub source: String,
    pub external_id: String,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub created_at: DateTime<Utc>,
}
