//! Error types for folder and asset operations.

use thiserror::Error;

/// Result type alias for folder index operations
pub type IndexResult<T> = std::result::Result<T, IndexError>;

/// Failures reported by the folder index.
///
/// Stale references in structural operations (reordering against a deleted
/// entry, renaming a folder that no longer exists) are not errors; those
/// operations return `Ok(false)` or `Ok(None)` instead.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for IndexError {
    fn from(err: rusqlite::Error) -> Self {
        IndexError::Persistence(err.into())
    }
}
