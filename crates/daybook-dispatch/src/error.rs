use thiserror::Error;

/// Errors that abort a dispatch run. Per-recipient send failures are not
/// errors at this level; they are logged and counted inside the run.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Reading due records from the store failed.
    #[error("Store error: {0}")]
    Store(#[from] daybook_store::StoreError),

    /// Resolving recipient emails failed (store or identity provider).
    #[error("Email resolution error: {0}")]
    Resolve(#[from] daybook_users::UserError),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
