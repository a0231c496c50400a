use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entity::models::{Contact, ContactPatch, InteractionRecord, Organization};
use rolo_common::error::RoloResult;

#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Full snapshot used to seed a per-run identity matcher.
    async fn list_all(&self) -> RoloResult<Vec<Contact>>;

    async fn create(&self, contact: Contact) -> RoloResult<Contact>;

    /// Fill in missing fields on an existing contact. A non-empty stored
    /// value is never replaced; safe to call twice with the same patch.
    async fn enrich(&self, id: Uuid, patch: ContactPatch) -> RoloResult<()>;

    /// Move `last_contacted_at` forward to `ts` if `ts` is later than the
    /// stored value. Never moves it backward.
    async fn touch_last_contacted(&self, id: Uuid, ts: DateTime<Utc>) -> RoloResult<()>;
}

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Find an organization by name or create it. Creation races are
    /// resolved by re-querying by name after a failed insert, not a lock.
    async fn find_or_create(&self, name: &str, domain: Option<&str>) -> RoloResult<Organization>;
}

#[async_trait]
pub trait InteractionRepository: Send + Sync {
    /// Append one interaction. Safe to call twice for the same external
    /// record only in the crash window between entity write and ledger
    /// record; callers accept the rare duplicate.
    async fn append(&self, interaction: InteractionRecord) -> RoloResult<InteractionRecord>;
}
