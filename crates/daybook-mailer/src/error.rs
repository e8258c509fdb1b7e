use thiserror::Error;

/// Errors that can occur delivering one email.
#[derive(Debug, Error)]
pub enum MailError {
    /// Client construction or transport-level failure (DNS, TLS, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(String),

    /// The email API rejected the request.
    #[error("Email API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
}
