pub mod import;
pub mod models;

pub use import::{DirectoryImportConfig, DirectoryImporter};
