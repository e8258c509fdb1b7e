use thiserror::Error;

/// Errors that can occur within the store subsystem.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No row of the given entity owned by the caller matches the id.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A field value failed validation before reaching SQL.
    #[error("Invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;
