pub mod calendar;
pub mod connector;
pub mod directory;
pub mod engine;
pub mod filters;
pub mod identity;
pub mod mailbox;
pub mod outbound;

#[cfg(test)]
pub(crate) mod testutil;

pub use connector::{FetchMode, SourceConnector, SourceError, SourcePage};
pub use engine::{ImportError, ImportSummary, RecordImporter, SkipReason, SyncEngine};
pub use identity::{IdentityMatcher, IdentityResolver};
