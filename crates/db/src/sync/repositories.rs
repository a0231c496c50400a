use async_trait::async_trait;
use uuid::Uuid;

use crate::sync::models::{EntityType, SyncState};
use rolo_common::error::RoloResult;

#[async_trait]
pub trait SyncStateRepository: Send + Sync {
    /// Get or create the state row for a source. New rows start idle with
    /// no cursor.
    async fn get_or_create(&self, source: &str) -> RoloResult<SyncState>;

    /// Atomically flip idle/error → syncing, clearing any stale error
    /// message. Returns `None` when a run is already in flight for this
    /// source (lock not acquired).
    async fn acquire_lock(&self, source: &str) -> RoloResult<Option<SyncState>>;

    /// Mark a run finished: status idle, `last_synced_at = now`, error
    /// cleared. The stored cursor is replaced only when `cursor` is `Some`;
    /// a window-mode run that produced no token keeps the prior value.
    async fn mark_completed(&self, id: Uuid, cursor: Option<&str>) -> RoloResult<SyncState>;

    /// Mark a run failed with an error message. Cursor and `last_synced_at`
    /// are left untouched so the next run can still resume.
    async fn mark_failed(&self, id: Uuid, error_message: &str) -> RoloResult<SyncState>;
}

#[async_trait]
pub trait SyncLedgerRepository: Send + Sync {
    /// Has this external record already been applied?
    async fn exists(&self, source: &str, external_id: &str) -> RoloResult<bool>;

    /// Record a successfully applied external record. Inserting an already
    /// present (source, external_id) pair is a silent no-op, not an error.
    async fn record(
        &self,
        source: &str,
        external_id: &str,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> RoloResult<()>;
}
