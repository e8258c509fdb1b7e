use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use daybook_core::config::IdentityConfig;

use crate::error::{Result, UserError};

/// Bound on every lookup call; there are no retries, so a hung request must
/// not stall the whole dispatch batch longer than this.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Lookup-by-id seam against the authentication service.
///
/// Implemented by [`HttpIdentityProvider`] in production and by stubs in
/// tests. `Ok(None)` means the user exists without an email, or does not
/// exist at all — callers treat both as "no address resolvable".
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn email_for(&self, user_id: &str) -> Result<Option<String>>;
}

/// Admin-API client: GET {base_url}/admin/users/{id} with a service key.
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl HttpIdentityProvider {
    pub fn new(config: &IdentityConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| UserError::Provider(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
        })
    }
}

#[derive(Deserialize)]
struct IdentityRecord {
    email: Option<String>,
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn email_for(&self, user_id: &str) -> Result<Option<String>> {
        let url = format!("{}/admin/users/{}", self.base_url, user_id);
        debug!(user_id, "identity provider lookup");

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| UserError::Provider(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(UserError::Provider(format!(
                "lookup for {user_id} returned HTTP {}",
                resp.status()
            )));
        }

        let record: IdentityRecord = resp
            .json()
            .await
            .map_err(|e| UserError::Provider(e.to_string()))?;
        Ok(record.email)
    }
}

/// Placeholder when no identity provider is configured: the profile cache is
/// then the only email source.
pub struct NoIdentityProvider;

#[async_trait]
impl IdentityProvider for NoIdentityProvider {
    fn name(&self) -> &str {
        "none"
    }

    async fn email_for(&self, _user_id: &str) -> Result<Option<String>> {
        Ok(None)
    }
}
