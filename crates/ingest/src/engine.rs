use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use rolo_common::error::RoloError;
use rolo_db::sync::models::{EntityType, SyncState};
use rolo_db::sync::repositories::{SyncLedgerRepository, SyncStateRepository};

use crate::connector::{FetchMode, SourceError, SourcePage};
use crate::outbound::{OutboundQueue, OutboundTrigger};

/// Why a fetched record was not applied. `as_str` values are the tally keys
/// reported in the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SkipReason {
    AlreadyImported,
    AutomatedSender,
    BroadcastRecipients,
    CalendarInvite,
    AutoGeneratedSubject,
    MissingEvent,
    MissingStart,
    AllDayEvent,
    CancelledEvent,
    DeclinedEvent,
    SoloEvent,
    MissingEmail,
    RecordFailed,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyImported => "already_imported",
            Self::AutomatedSender => "automated_sender",
            Self::BroadcastRecipients => "broadcast_recipients",
            Self::CalendarInvite => "calendar_invite",
            Self::AutoGeneratedSubject => "auto_generated_subject",
            Self::MissingEvent => "missing_event",
            Self::MissingStart => "missing_start",
            Self::AllDayEvent => "all_day_event",
            Self::CancelledEvent => "cancelled_event",
            Self::DeclinedEvent => "declined_event",
            Self::SoloEvent => "solo_event",
            Self::MissingEmail => "missing_email",
            Self::RecordFailed => "record_failed",
        }
    }
}

/// Aggregate counts for one run. Invariant:
/// `fetched == processed + skipped_total()`.
#[derive(Debug)]
pub struct ImportSummary {
    pub source: String,
    pub fetched: usize,
    pub processed: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl ImportSummary {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            fetched: 0,
            processed: 0,
            skipped: BTreeMap::new(),
        }
    }

    fn tally(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }
}

/// What handling one record produced.
#[derive(Debug)]
pub enum RecordOutcome {
    /// Entity written; the engine records the ledger entry.
    Applied {
        entity_type: EntityType,
        entity_id: Uuid,
    },
    /// Filtered out or unusable; no side effects were performed.
    Skipped(SkipReason),
}

/// A single record's failure. Logged and tallied, never fatal to the run;
/// with no ledger entry written the record is retried on the next run.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct RecordFailure(pub String);

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    // thiserror reserves a field named `source` for the error cause.
    #[error("fetch failed for {source_name}: {message}")]
    Fetch {
        source_name: String,
        message: String,
    },

    #[error(transparent)]
    Store(#[from] RoloError),
}

/// Per-source specialization of the incremental fetch algorithm: listing
/// pages (via the source connector), identifying records, and mapping one
/// record into local entities.
#[async_trait]
pub trait RecordImporter: Send {
    type Record: Send + Sync;

    fn source_name(&self) -> &'static str;

    /// Lookback used when no cursor and no prior successful sync exist.
    fn bootstrap_window(&self) -> Duration;

    async fn list_page(
        &self,
        mode: &FetchMode,
        page_token: Option<&str>,
    ) -> Result<SourcePage<Self::Record>, SourceError>;

    fn record_id(&self, record: &Self::Record) -> String;

    /// Apply one record: filter, resolve identity, write entities. Must not
    /// touch the ledger; the engine records it after this returns Applied.
    async fn import_record(
        &mut self,
        record: &Self::Record,
    ) -> Result<RecordOutcome, RecordFailure>;
}

/// Drives the generic incremental fetch run: cursor/window mode selection,
/// sequential pagination, ledger gating, and sync-state transitions.
pub struct SyncEngine<S, L> {
    state_repo: S,
    ledger: L,
    outbound: Option<(OutboundTrigger, Arc<dyn OutboundQueue>)>,
}

impl<S, L> SyncEngine<S, L>
where
    S: SyncStateRepository,
    L: SyncLedgerRepository,
{
    pub fn new(state_repo: S, ledger: L) -> Self {
        Self {
            state_repo,
            ledger,
            outbound: None,
        }
    }

    /// Attach an outbound push queue, fired after any run that applied at
    /// least one record.
    pub fn with_outbound(mut self, trigger: OutboundTrigger, queue: Arc<dyn OutboundQueue>) -> Self {
        self.outbound = Some((trigger, queue));
        self
    }

    pub async fn run<I>(&self, importer: &mut I, initial: bool) -> Result<ImportSummary, ImportError>
    where
        I: RecordImporter,
    {
        let source = importer.source_name();

        self.state_repo.get_or_create(source).await?;

        let state = match self.state_repo.acquire_lock(source).await? {
            Some(state) => state,
            None => {
                tracing::info!(source, "sync already running, skipping");
                return Ok(ImportSummary::new(source));
            }
        };

        match self.drive(importer, &state, initial).await {
            Ok((summary, new_cursor)) => {
                // A completion that cannot be persisted still has to release
                // the run lock, or the source stays 'syncing' forever.
                if let Err(err) = self
                    .state_repo
                    .mark_completed(state.id, new_cursor.as_deref())
                    .await
                {
                    let message = err.to_string();
                    tracing::error!(source, error = %message, "failed to persist completion");
                    if let Err(mark_err) = self.state_repo.mark_failed(state.id, &message).await {
                        tracing::error!(source, error = %mark_err, "failed to persist error status");
                    }
                    return Err(ImportError::Store(err));
                }

                tracing::info!(
                    source,
                    fetched = summary.fetched,
                    processed = summary.processed,
                    skipped = summary.skipped_total(),
                    "sync completed"
                );

                if summary.processed > 0 {
                    if let Some((trigger, queue)) = &self.outbound {
                        trigger.fire(source, Arc::clone(queue));
                    }
                }

                Ok(summary)
            }
            Err(err) => {
                let message = err.to_string();
                tracing::error!(source, error = %message, "sync failed");
                if let Err(mark_err) = self.state_repo.mark_failed(state.id, &message).await {
                    tracing::error!(source, error = %mark_err, "failed to persist error status");
                }
                Err(err)
            }
        }
    }

    async fn drive<I>(
        &self,
        importer: &mut I,
        state: &SyncState,
        initial: bool,
    ) -> Result<(ImportSummary, Option<String>), ImportError>
    where
        I: RecordImporter,
    {
        let source = importer.source_name();
        let bootstrap_start = Utc::now() - importer.bootstrap_window();
        // Anchor for window-mode fallback: last successful sync, or the
        // bootstrap lookback when there has never been one.
        let window_anchor = state.last_synced_at.unwrap_or(bootstrap_start);

        let mut mode = if initial {
            FetchMode::Window(bootstrap_start)
        } else if let Some(cursor) = state.cursor.clone() {
            FetchMode::Cursor(cursor)
        } else {
            FetchMode::Window(window_anchor)
        };

        let mut page_token: Option<String> = None;
        let mut latest_cursor: Option<String> = None;
        let mut summary = ImportSummary::new(source);

        loop {
            let page = match importer.list_page(&mode, page_token.as_deref()).await {
                Ok(page) => page,
                Err(SourceError::CursorExpired) if matches!(mode, FetchMode::Cursor(_)) => {
                    tracing::warn!(source, "cursor invalidated, falling back to window fetch");
                    mode = FetchMode::Window(window_anchor);
                    page_token = None;
                    continue;
                }
                Err(e) => {
                    return Err(ImportError::Fetch {
                        source_name: source.to_string(),
                        message: e.to_string(),
                    });
                }
            };

            for record in &page.records {
                summary.fetched += 1;
                let external_id = importer.record_id(record);

                if self.ledger.exists(source, &external_id).await? {
                    summary.tally(SkipReason::AlreadyImported);
                    continue;
                }

                match importer.import_record(record).await {
                    Ok(RecordOutcome::Applied {
                        entity_type,
                        entity_id,
                    }) => {
                        self.ledger
                            .record(source, &external_id, entity_type, entity_id)
                            .await?;
                        summary.processed += 1;
                    }
                    Ok(RecordOutcome::Skipped(reason)) => {
                        tracing::debug!(
                            source,
                            external_id,
                            reason = reason.as_str(),
                            "record skipped"
                        );
                        summary.tally(reason);
                    }
                    Err(failure) => {
                        tracing::warn!(
                            source,
                            external_id,
                            error = %failure,
                            "record import failed, skipping"
                        );
                        summary.tally(SkipReason::RecordFailed);
                    }
                }
            }

            if let Some(cursor) = page.next_cursor {
                latest_cursor = Some(cursor);
            }
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok((summary, latest_cursor))
    }
}
