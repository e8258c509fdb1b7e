use thiserror::Error;

/// Errors that can occur while resolving a user's email address.
#[derive(Debug, Error)]
pub enum UserError {
    /// Underlying store error reading profile rows.
    #[error("Store error: {0}")]
    Store(#[from] daybook_store::StoreError),

    /// The identity provider call failed (transport, auth, or bad response).
    #[error("Identity provider error: {0}")]
    Provider(String),
}

pub type Result<T> = std::result::Result<T, UserError>;
