use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::entity::models::{
    Contact, ContactPatch, InteractionKind, InteractionRecord, Organization,
};
use crate::entity::repositories::{
    ContactRepository, InteractionRepository, OrganizationRepository,
};
use rolo_common::error::{RoloError, RoloResult};

#[derive(Clone)]
pub struct PgContactRepository {
    pool: PgPool,
}

impl PgContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> RoloResult<Contact> {
        Ok(Contact {
            id: row.get("id"),
            display_name: row.get("display_name"),
            email: row.get("email"),
            phone: row.get("phone"),
            organization_id: row.get("organization_id"),
            notes: row.get("notes"),
            last_contacted_at: row.get("last_contacted_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

const CONTACT_COLUMNS: &str =
    "id, display_name, email, phone, organization_id, notes, last_contacted_at, created_at, updated_at";

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn list_all(&self) -> RoloResult<Vec<Contact>> {
        let rows = sqlx::query(&format!(
            "select {CONTACT_COLUMNS} from contacts order by created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RoloError::Database(e.to_string()))?;

        rows.into_iter().map(Self::map_row).collect()
    }

    async fn create(&self, contact: Contact) -> RoloResult<Contact> {
        // Upsert keyed by email: a second create for the same address
        // returns the existing row instead of failing.
        let row = sqlx::query(&format!(
            "insert into contacts
               (id, display_name, email, phone, organization_id, notes, last_contacted_at, created_at, updated_at)
             values ($1, $2, $3, $4, $5, $6, $7, $8, $8)
             on conflict (email) do update set updated_at = excluded.updated_at
             returning {CONTACT_COLUMNS}"
        ))
        .bind(contact.id)
        .bind(&contact.display_name)
        .bind(&contact.email)
        .bind(&contact.phone)
        .bind(contact.organization_id)
        .bind(&contact.notes)
        .bind(contact.last_contacted_at)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RoloError::Database(e.to_string()))?;

        Self::map_row(row)
    }

    async fn enrich(&self, id: Uuid, patch: ContactPatch) -> RoloResult<()> {
        if patch.is_empty() {
            return Ok(());
        }

        // nullif/coalesce keeps any non-empty stored value in place.
        sqlx::query(
            "update contacts set
               display_name = coalesce(nullif(display_name, ''), $2, display_name),
               phone = coalesce(nullif(phone, ''), $3),
               organization_id = coalesce(organization_id, $4),
               notes = coalesce(nullif(notes, ''), $5),
               updated_at = $6
             where id = $1",
        )
        .bind(id)
        .bind(&patch.display_name)
        .bind(&patch.phone)
        .bind(patch.organization_id)
        .bind(&patch.notes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| RoloError::Database(e.to_string()))?;

        Ok(())
    }

    async fn touch_last_contacted(&self, id: Uuid, ts: DateTime<Utc>) -> RoloResult<()> {
        sqlx::query(
            "update contacts set
               last_contacted_at = greatest(coalesce(last_contacted_at, $2), $2),
               updated_at = $3
             where id = $1",
        )
        .bind(id)
        .bind(ts)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| RoloError::Database(e.to_string()))?;

        Ok(())
    }
}

#[derive(Clone)]
pub struct PgOrganizationRepository {
    pool: PgPool,
}

impl PgOrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> RoloResult<Organization> {
        Ok(Organization {
            id: row.get("id"),
            name: row.get("name"),
            domain: row.get("domain"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl OrganizationRepository for PgOrganizationRepository {
    async fn find_or_create(&self, name: &str, domain: Option<&str>) -> RoloResult<Organization> {
        // Insert first; a concurrent creator wins the unique index and we
        // re-query by name afterwards.
        let inserted = sqlx::query(
            "insert into organizations (id, name, domain, created_at)
             values ($1, $2, $3, $4)
             on conflict (name) do nothing
             returning id, name, domain, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(domain)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RoloError::Database(e.to_string()))?;

        if let Some(row) = inserted {
            return Self::map_row(row);
        }

        let row = sqlx::query(
            "select id, name, domain, created_at from organizations where name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RoloError::Database(e.to_string()))?;

        match row {
            Some(r) => Self::map_row(r),
            None => Err(RoloError::NotFound(format!("organization {name}"))),
        }
    }
}

#[derive(Clone)]
pub struct PgInteractionRepository {
    pool: PgPool,
}

impl PgInteractionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> RoloResult<InteractionRecord> {
        let kind_raw: String = row.get("kind");
        let kind = InteractionKind::from_str(&kind_raw).map_err(RoloError::Internal)?;

        Ok(InteractionRecord {
            id: row.get("id"),
            contact_id: row.get("contact_id"),
            kind,
            occurred_at: row.get("occurred_at"),
            note: row.get("note"),
            metadata: row.get("metadata"),
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl InteractionRepository for PgInteractionRepository {
    async fn append(&self, interaction: InteractionRecord) -> RoloResult<InteractionRecord> {
        let row = sqlx::query(
            "insert into interactions (id, contact_id, kind, occurred_at, note, metadata, created_at)
             values ($1, $2, $3, $4, $5, $6, $7)
             returning id, contact_id, kind, occurred_at, note, metadata, created_at",
        )
        .bind(interaction.id)
        .bind(interaction.contact_id)
        .bind(interaction.kind.as_str())
        .bind(interaction.occurred_at)
        .bind(&interaction.note)
        .bind(&interaction.metadata)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RoloError::Database(e.to_string()))?;

        Self::map_row(row)
    }
}
