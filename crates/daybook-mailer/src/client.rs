use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use daybook_core::config::MailConfig;

use crate::error::MailError;
use crate::{Mailer, OutboundEmail};

/// Bound on the send call; there are no retries, so a hung request must not
/// stall the dispatch batch longer than this.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Email API client: POST {base_url}/emails with a bearer API key.
pub struct HttpMailer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    fn sender(&self) -> &str {
        &self.from
    }

    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let url = format!("{}/emails", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MailError::Api {
                status: status.as_u16(),
                body,
            });
        }

        info!(
            to = ?email.to,
            subject = %email.subject,
            "email dispatched"
        );
        Ok(())
    }
}
