use thiserror::Error;

/// Error taxonomy shared across the workspace. Repository and importer
/// code maps driver errors into these variants at the boundary so callers
/// never match on backend-specific types.
#[derive(Debug, Error)]
pub enum RoloError {
    #[error("config: {0}")]
    Config(String),

    #[error("database: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("internal: {0}")]
    Internal(String),
}

pub type RoloResult<T> = Result<T, RoloError>;
