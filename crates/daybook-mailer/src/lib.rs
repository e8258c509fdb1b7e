//! `daybook-mailer` — transactional email delivery.
//!
//! One operation: send a single email (sender, recipients, subject, HTML
//! body) over the provider's HTTP API. No batching, no delivery receipts,
//! no retries — a failed send is reported to the caller and that is all.

mod client;
pub mod error;

pub use client::HttpMailer;
pub use error::MailError;

use async_trait::async_trait;
use serde::Serialize;

/// A single outbound transactional email. Serializes directly as the email
/// API's request body.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Delivery seam — implemented by [`HttpMailer`] in production and by a
/// recording double in dispatch tests.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// The configured sender address, used as the `from` field of every email.
    fn sender(&self) -> &str;

    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}
