use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// How the next page is addressed: an opaque source-issued cursor, or an
/// absolute lower-bound timestamp for bootstrap/fallback fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchMode {
    Cursor(String),
    Window(DateTime<Utc>),
}

/// One page of records from a source, plus continuation state. The
/// `next_cursor` (if any) is only persisted once the run completes.
#[derive(Debug, Clone)]
pub struct SourcePage<R> {
    pub records: Vec<R>,
    pub next_page_token: Option<String>,
    pub next_cursor: Option<String>,
}

impl<R> SourcePage<R> {
    pub fn last(records: Vec<R>, next_cursor: Option<String>) -> Self {
        Self {
            records,
            next_page_token: None,
            next_cursor,
        }
    }
}

/// Typed fetch failures. Cursor invalidation is its own variant so the
/// engine can classify it without sniffing error text.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("cursor expired or unrecognized")]
    CursorExpired,

    #[error("fetch failed: {0}")]
    Fetch(String),
}

/// Page-by-page access to an external source. Implementations own
/// authentication, marshaling, and rate limiting; the engine only sees
/// records and continuation state.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    type Record: Send + Sync;

    async fn list_page(
        &self,
        mode: &FetchMode,
        page_token: Option<&str>,
    ) -> Result<SourcePage<Self::Record>, SourceError>;
}
