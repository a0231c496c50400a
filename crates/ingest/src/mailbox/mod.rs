pub mod headers;
pub mod import;
pub mod models;

pub use import::{MailboxConnector, MailboxImportConfig, MailboxImporter};
