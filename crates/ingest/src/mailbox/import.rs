//! Mailbox source: turns inbox messages into contacts and email
//! interactions, attributed to the sender.

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
use crate::filters::MailboxFilter;
use crate::identity::IdentityResolver;

use super::models::{MailMessage, MessageRef};

/// Mailbox listings only carry message ids; headers come from a second
/// detail fetch per message.
#[async_trait]
pub trait MailboxConnector: SourceConnector<Record = MessageRef> {
    async fn fetch_detail(&self, id: &str) -> Result<MailMessage, SourceError>;
}

#[derive(Debug, Clone)]
pub struct MailboxImportConfig {
    pub lookback_days: u32,
    pub broadcast_recipient_limit: usize,
}

impl Default for MailboxImportConfig {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            broadcast_recipient_limit: 4,
        }
    }
}

impl MailboxImportConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            lookback_days: config.mailbox_lookback_days,
            broadcast_recipient_limit: config.broadcast_recipient_limit,
        }
    }
}

pub struct MailboxImporter<X, C, O, I> {
    connector: X,
    resolver: IdentityResolver<C, O>,
    contacts: Arc<C>,
    interactions: Arc<I>,
    filter: MailboxFilter,
    lookback_days: u32,
}

impl<X, C, O, I> MailboxImporter<X, C, O, I>
where
    X: MailboxConnector,
    C: ContactRepository,
    O: OrganizationRepository,
    I: InteractionRepository,
{
    pub fn new(
        connector: X,
        resolver: IdentityResolver<C, O>,
        contacts: Arc<C>,
        interactions: Arc<I>,
        config: MailboxImportConfig,
    ) -> Self {
        Self {
            connector,
            resolver,
            contacts,
            interactions,
            filter: MailboxFilter {
                broadcast_recipient_limit: config.broadcast_recipient_limit,
            },
            lookback_days: config.lookback_days,
        }
    }
}

#[async_trait]
impl<X, C, O, I> RecordImporter for MailboxImporter<X, C, O, I>
where
    X: MailboxConnector,
    C: ContactRepository,
    O: OrganizationRepository,
    I: InteractionRepository,
{
    type Record = MessageRef;

    fn source_name(&self) -> &'static str {
        "mailbox"
    }

    fn bootstrap_window(&self) -> Duration {
        Duration::days(i64::from(self.lookback_days))
    }

    async fn list_page(
        &self,
        mode: &FetchMode,
        page_token: Option<&str>,
    ) -> Result<SourcePage<MessageRef>, SourceError> {
        self.connector.list_page(mode, page_token).await
    }

    fn record_id(&self, record: &MessageRef) -> String {
        record.id.clone()
    }

    async fn import_record(
        &mut self,
        record: &MessageRef,
    ) -> Result<RecordOutcome, RecordFailure> {
        let message = self
            .connector
            .fetch_detail(&record.id)
            .await
            .map_err(|e| RecordFailure(format!("detail fetch failed: {e}")))?;

        if let Err(reason) = self.filter.check(&message) {
            tracing::debug!(message_id = %message.id, reason = reason.as_str(), "message filtered");
            return Ok(RecordOutcome::Skipped(reason));
        }

        let Some(sender) = message.from_address() else {
            return Ok(RecordOutcome::Skipped(SkipReason::MissingEmail));
        };
        let Some(occurred_at) = message.occurred_at() else {
            return Err(RecordFailure(format!(
                "message {} has no parsable date",
                message.id
            )));
        };

        let resolution = self
            .resolver
            .resolve_or_create(&sender.email, sender.display_name.as_deref(), None)
            .await
            .map_err(|e| RecordFailure(e.to_string()))?;

        let stored = self
            .interactions
            .append(InteractionRecord {
                id: Uuid::new_v4(),
                contact_id: resolution.contact_id,
                kind: InteractionKind::Email,
                occurred_at,
                note: message.subject().to_string(),
                metadata: Some(json!({
                    "message_id": message.id,
                    "thread_id": message.thread_id,
                    "subject": message.subject(),
                    "snippet": message.snippet,
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
