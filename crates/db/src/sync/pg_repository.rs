use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::sync::models::{EntityType, SyncState, SyncStatus};
use crate::sync::repositories::{SyncLedgerRepository, SyncStateRepository};
use rolo_common::error::{RoloError, RoloResult};

const STATE_COLUMNS: &str =
    "id, source, status, cursor, last_synced_at, error_message, created_at, updated_at";

#[derive(Clone)]
pub struct PgSyncStateRepository {
    pool: PgPool,
}

impl PgSyncStateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> RoloResult<SyncState> {
        let status_raw: String = row.get("status");
        let status = SyncStatus::from_str(&status_raw).map_err(RoloError::Internal)?;

        Ok(SyncState {
            id: row.get("id"),
            source: row.get("source"),
            status,
            cursor: row.get("cursor"),
            last_synced_at: row.get("last_synced_at"),
            error_message: row.get("error_message"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl SyncStateRepository for PgSyncStateRepository {
    async fn get_or_create(&self, source: &str) -> RoloResult<SyncState> {
        let row = sqlx::query(&format!(
            "insert into sync_states (id, source)
             values ($1, $2)
             on conflict (source) do update set updated_at = now()
             returning {STATE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(source)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RoloError::Database(e.to_string()))?;

        Self::map_row(row)
    }

    async fn acquire_lock(&self, source: &str) -> RoloResult<Option<SyncState>> {
        let row = sqlx::query(&format!(
            "update sync_states
             set status = 'syncing', error_message = null, updated_at = $1
             where source = $2 and status != 'syncing'
             returning {STATE_COLUMNS}"
        ))
        .bind(Utc::now())
        .bind(source)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RoloError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::map_row(r)?)),
            None => Ok(None),
        }
    }

    async fn mark_completed(&self, id: Uuid, cursor: Option<&str>) -> RoloResult<SyncState> {
        let now = Utc::now();
        // coalesce keeps the prior cursor when the final page supplied none.
        let row = sqlx::query(&format!(
            "update sync_states
             set status = 'idle', last_synced_at = $1,
                 cursor = coalesce($2, cursor), error_message = null, updated_at = $1
             where id = $3
             returning {STATE_COLUMNS}"
        ))
        .bind(now)
        .bind(cursor)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RoloError::Database(e.to_string()))?;

        Self::map_row(row)
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> RoloResult<SyncState> {
        let row = sqlx::query(&format!(
            "update sync_states
             set status = 'error', error_message = $1, updated_at = $2
             where id = $3
             returning {STATE_COLUMNS}"
        ))
        .bind(error_message)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RoloError::Database(e.to_string()))?;

        Self::map_row(row)
    }
}

#[derive(Clone)]
pub struct PgSyncLedgerRepository {
    pool: PgPool,
}

impl PgSyncLedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SyncLedgerRepository for PgSyncLedgerRepository {
    async fn exists(&self, source: &str, external_id: &str) -> RoloResult<bool> {
        let row = sqlx::query(
            "select 1 as present from sync_ledger where source = $1 and external_id = $2",
        )
        .bind(source)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RoloError::Database(e.to_string()))?;

        Ok(row.is_some())
    }

    async fn record(
        &self,
        source: &str,
        external_id: &str,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> RoloResult<()> {
        sqlx::query(
            "insert into sync_ledger (id, source, external_id, entity_type, entity_id, created_at)
             values ($1, $2, $3, $4, $5, $6)
             on conflict (source, external_id) do nothing",
        )
        .bind(Uuid::new_v4())
        .bind(source)
        .bind(external_id)
        .bind(entity_type.as_str())
        .bind(entity_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| RoloError::Database(e.to_string()))?;

        Ok(())
    }
}
