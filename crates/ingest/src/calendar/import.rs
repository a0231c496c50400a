//! Calendar source: turns attended meetings into contacts and meeting
//! interactions, attributed to the first attendee who isn't the calendar
//! owner.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use rolo_config::AppConfig;
use rolo_db::entity::models::{InteractionKind, InteractionRecord};
use rolo_db::entity::repositories::{
    ContactRepository, InteractionRepository, OrganizationRepository,
};
use rolo_db::sync::models::EntityType;

use crate::connector::{FetchMode, SourceConnector, SourceError, SourcePage};
use crate::engine::{RecordFailure, RecordImporter, RecordOutcome, SkipReason};
use crate::filters::check_event;
use crate::identity::IdentityResolver;

use super::models::CalendarEvent;

#[derive(Debug, Clone)]
pub struct CalendarImportConfig {
    pub lookback_days: u32,
}

impl Default for CalendarImportConfig {
    fn default() -> Self {
        Self { lookback_days: 90 }
    }
}

impl CalendarImportConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            lookback_days: config.calendar_lookback_days,
        }
    }
}

pub struct CalendarImporter<X, C, O, I> {
    connector: X,
    resolver: IdentityResolver<C, O>,
    contacts: Arc<C>,
    interactions: Arc<I>,
    lookback_days: u32,
}

impl<X, C, O, I> CalendarImporter<X, C, O, I>
where
    X: SourceConnector<Record = CalendarEvent>,
    C: ContactRepository,
    O: OrganizationRepository,
    I: InteractionRepository,
{
    pub fn new(
        connector: X,
        resolver: IdentityResolver<C, O>,
        contacts: Arc<C>,
        interactions: Arc<I>,
        config: CalendarImportConfig,
    ) -> Self {
        Self {
            connector,
            resolver,
            contacts,
            interactions,
            lookback_days: config.lookback_days,
        }
    }
}

#[async_trait]
impl<X, C, O, I> RecordImporter for CalendarImporter<X, C, O, I>
where
    X: SourceConnector<Record = CalendarEvent>,
    C: ContactRepository,
    O: OrganizationRepository,
    I: InteractionRepository,
{
    type Record = CalendarEvent;

    fn source_name(&self) -> &'static str {
        "calendar"
    }

    fn bootstrap_window(&self) -> Duration {
        Duration::days(i64::from(self.lookback_days))
    }

    async fn list_page(
        &self,
        mode: &FetchMode,
        page_token: Option<&str>,
    ) -> Result<SourcePage<CalendarEvent>, SourceError> {
        self.connector.list_page(mode, page_token).await
    }

    fn record_id(&self, record: &CalendarEvent) -> String {
        record.id.clone()
    }

    async fn import_record(
        &mut self,
        event: &CalendarEvent,
    ) -> Result<RecordOutcome, RecordFailure> {
        if let Err(reason) = check_event(event) {
            tracing::debug!(event_id = %event.id, reason = reason.as_str(), "event filtered");
            return Ok(RecordOutcome::Skipped(reason));
        }

        let Some(counterpart) = event.counterpart() else {
            return Ok(RecordOutcome::Skipped(SkipReason::MissingEmail));
        };
        let Some(email) = counterpart.email.as_deref() else {
            return Ok(RecordOutcome::Skipped(SkipReason::MissingEmail));
        };
        let Some(occurred_at) = event.start_time() else {
            return Ok(RecordOutcome::Skipped(SkipReason::MissingStart));
        };

        let resolution = self
            .resolver
            .resolve_or_create(email, counterpart.display_name.as_deref(), None)
            .await
            .map_err(|e| RecordFailure(e.to_string()))?;

        let summary = event.summary.as_deref().unwrap_or("(untitled event)");
        let stored = self
            .interactions
            .append(InteractionRecord {
                id: Uuid::new_v4(),
                contact_id: resolution.contact_id,
                kind: InteractionKind::Meeting,
                occurred_at,
                note: summary.to_string(),
                metadata: Some(json!({
                    "event_id": event.id,
                    "summary": summary,
                    "attendee_count": event.attendees.len(),
                })),
                created_at: Utc::now(),
            })
            .await
            .map_err(|e| RecordFailure(e.to_string()))?;

        self.contacts
            .touch_last_contacted(resolution.contact_id, occurred_at)
            .await
            .map_err(|e| RecordFailure(e.to_string()))?;

        Ok(RecordOutcome::Applied {
            entity_type: EntityType::Interaction,
            entity_id: stored.id,
        })
    }
}
